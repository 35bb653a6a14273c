use crate::error::Res;
use crate::model::{Header, Mapping};
use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Rows of string cells under a header row. Every row has exactly one cell per header; blank
/// cells are the empty string.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Table {
    mapping: Mapping,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse raw sheet data, where the first row holds the headers, into a `Table`.
    ///
    /// Think of `sheet_data` as something that looks like `Vec<Vec<String>>`. Short rows are
    /// padded with empty cells, rows that are entirely blank are dropped.
    pub fn parse<S, R, I>(sheet_data: I) -> Res<Self>
    where
        S: Into<String>,
        R: IntoIterator<Item = S>,
        I: IntoIterator<Item = R>,
    {
        let mut rows = sheet_data.into_iter();
        let mapping = match rows.next() {
            Some(header_row) => Mapping::new(header_row),
            None => bail!("An empty data set cannot be parsed into a table"),
        };
        let len = mapping.len();

        let mut data = Vec::new();
        for (row_ix, row) in rows.enumerate() {
            let mut values: Vec<String> = row.into_iter().map(|s| s.into()).collect();
            // Spreadsheet readers report trailing blank cells beyond the header width.
            while values.len() > len && values.last().is_some_and(|v| v.trim().is_empty()) {
                values.pop();
            }
            if values.len() > len {
                bail!(
                    "A row longer than the headers list was encountered at row {}",
                    row_ix + 2
                );
            }
            if values.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            values.resize(len, String::new());
            data.push(values);
        }

        Ok(Self {
            mapping,
            rows: data,
        })
    }

    /// Creates a `Table` from already-shaped parts.
    pub(crate) fn new(mapping: Mapping, rows: Vec<Vec<String>>) -> Res<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != mapping.len()) {
            bail!(
                "Row {bad} has {} cells but there are {} headers",
                rows[bad].len(),
                mapping.len()
            );
        }
        Ok(Self { mapping, rows })
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn headers(&self) -> &[Header] {
        self.mapping.headers()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell in `row` under `header`, or `None` when the table has no such column.
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.mapping.header_index(header)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }
}
