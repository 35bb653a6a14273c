//! Building file names for generated artifacts.

use chrono::NaiveDate;

const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const SUBSTITUTE: char = '_';

/// Replaces reserved and control characters with `_` and trims trailing spaces and periods.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || (c as u32) < 0x20 {
                SUBSTITUTE
            } else {
                c
            }
        })
        .collect();
    replaced.trim_end_matches([' ', '.']).to_string()
}

/// The file name of a group's billing document, e.g. `请款单（甲公司-150元-深佳-2025-03-01）.docx`.
pub(crate) fn billing_file_name(
    applicant: &str,
    grand_total: i64,
    company_label: &str,
    run_date: NaiveDate,
    extension: &str,
) -> String {
    sanitize_filename(&format!(
        "请款单（{applicant}-{grand_total}元-{company_label}-{}）.{extension}",
        run_date.format("%Y-%m-%d")
    ))
}

/// The file name of the zip archive bundling every artifact of a run.
pub(crate) fn archive_file_name(company_label: &str, run_date: NaiveDate) -> String {
    sanitize_filename(&format!(
        "请款单_{company_label}_{}.zip",
        run_date.format("%Y%m%d")
    ))
}
