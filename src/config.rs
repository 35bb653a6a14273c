//! Configuration file handling for the invoicer.
//!
//! The configuration file is stored at `$INVOICER_HOME/config.json` and holds the labels printed
//! on the documents, the template locations, the source column names and the ledger layout.

use crate::error::Res;
use crate::ooxml::{column_index, column_letters};
use crate::populate::BillingFormat;
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "invoicer";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const TEMPLATES: &str = "templates";
const OUTPUT: &str = "output";
const BILLING_TEMPLATE_STEM: &str = "billing";
const LEDGER_TEMPLATE: &str = "ledger.xlsx";
const DEFAULT_COMPANY_LABEL: &str = "深佳";
pub(crate) const DEFAULT_OFFICE_LABEL: &str = "专利代理部";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$INVOICER_HOME` and from there it loads `$INVOICER_HOME/config.json`. Relative
/// paths in the file are resolved against the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory with its `templates` and `output` subdirectories and writes an
    /// initial `config.json`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the home directory, e.g. `$HOME/invoicer`
    /// - `billing_template` - An optional `.docx` or `.xlsx` billing template to copy into
    ///   `templates/`. An `.xlsx` template switches the billing format to `excel`.
    /// - `ledger_template` - An optional `.xlsx` invoice request ledger to copy into `templates/`.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub fn create(
        dir: impl Into<PathBuf>,
        billing_template: Option<&Path>,
        ledger_template: Option<&Path>,
    ) -> Res<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative).context("Unable to create the invoicer home directory")?;
        let root = utils::canonicalize(&maybe_relative)?;
        utils::make_dir(&root.join(TEMPLATES))?;
        utils::make_dir(&root.join(OUTPUT))?;

        let mut config_file = ConfigFile::default();
        if let Some(source) = billing_template {
            let format = BillingFormat::from_path(source)?;
            let relative = PathBuf::from(TEMPLATES)
                .join(BILLING_TEMPLATE_STEM)
                .with_extension(format.extension());
            utils::copy(source, root.join(&relative))?;
            config_file.billing_format = format;
            config_file.billing_template = relative;
        }
        if let Some(source) = ledger_template {
            utils::copy(source, root.join(&config_file.ledger_template))?;
        }

        let config_path = root.join(CONFIG_JSON);
        config_file.save(&config_path)?;
        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load and validate the config file
    /// - return the loaded configuration object
    pub fn load(home: impl Into<PathBuf>) -> Res<Self> {
        let maybe_relative = home.into();
        if !maybe_relative.is_dir() {
            bail!(
                "The invoicer home directory is missing '{}', run `invoicer init` first",
                maybe_relative.display()
            );
        }
        let root = utils::canonicalize(&maybe_relative)?;
        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path)?;
        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn company_label(&self) -> &str {
        &self.config_file.company_label
    }

    pub fn office_label(&self) -> &str {
        &self.config_file.office_label
    }

    pub fn billing_format(&self) -> BillingFormat {
        self.config_file.billing_format
    }

    pub fn billing_template(&self) -> PathBuf {
        self.resolve(&self.config_file.billing_template)
    }

    pub fn ledger_template(&self) -> PathBuf {
        self.resolve(&self.config_file.ledger_template)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.config_file.output_dir)
    }

    pub fn columns(&self) -> &ColumnNames {
        &self.config_file.columns
    }

    pub fn ledger_layout(&self) -> &LedgerLayout {
        &self.config_file.ledger_layout
    }

    /// Checks if `p` is relative, and if so, resolves it against the home directory.
    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            return p.to_path_buf();
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration, every field but `app_name` and `config_version` is optional:
/// ```json
/// {
///   "app_name": "invoicer",
///   "config_version": 1,
///   "company_label": "深佳",
///   "office_label": "专利代理部",
///   "billing_format": "word",
///   "billing_template": "templates/billing.docx",
///   "ledger_template": "templates/ledger.xlsx",
///   "output_dir": "output",
///   "columns": { "group_key": "分割号", "official_fee": "官费" },
///   "ledger_layout": { "fee": ["D", "E"], "date": "K" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "invoicer"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The company name printed on every document and in the ledger
    #[serde(default = "default_company_label")]
    company_label: String,

    /// The department written into the ledger's office column
    #[serde(default = "default_office_label")]
    office_label: String,

    #[serde(default)]
    billing_format: BillingFormat,

    /// Path to the billing template (relative to the home directory or absolute)
    #[serde(default = "default_billing_template")]
    billing_template: PathBuf,

    /// Path to the invoice request ledger template (relative to the home directory or absolute)
    #[serde(default = "default_ledger_template")]
    ledger_template: PathBuf,

    /// Where generated documents are written (relative to the home directory or absolute)
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,

    #[serde(default)]
    columns: ColumnNames,

    #[serde(default)]
    ledger_layout: LedgerLayout,
}

fn default_company_label() -> String {
    DEFAULT_COMPANY_LABEL.to_string()
}

fn default_office_label() -> String {
    DEFAULT_OFFICE_LABEL.to_string()
}

fn default_billing_template() -> PathBuf {
    PathBuf::from(TEMPLATES)
        .join(BILLING_TEMPLATE_STEM)
        .with_extension(BillingFormat::default().extension())
}

fn default_ledger_template() -> PathBuf {
    PathBuf::from(TEMPLATES).join(LEDGER_TEMPLATE)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(OUTPUT)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            company_label: default_company_label(),
            office_label: default_office_label(),
            billing_format: BillingFormat::default(),
            billing_template: default_billing_template(),
            ledger_template: default_ledger_template(),
            output_dir: default_output_dir(),
            columns: ColumnNames::default(),
            ledger_layout: LedgerLayout::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or is not an invoicer config
    fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data).context("Unable to write config file")
    }
}

/// The names of the source columns the billing run relies on.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ColumnNames {
    /// The grouping key, one billing document per distinct value
    pub group_key: String,
    pub official_fee: String,
    pub agency_fee: String,
    /// Optional, a missing column means an empty applicant
    pub applicant: String,
    /// The preferred case number
    pub primary_case_number: String,
    /// Used when the preferred case number is blank
    pub internal_case_number: String,
    /// Rebuilt per group
    pub sequence: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            group_key: "分割号".to_string(),
            official_fee: "官费".to_string(),
            agency_fee: "代理费".to_string(),
            applicant: "申请人".to_string(),
            primary_case_number: "集佳案号".to_string(),
            internal_case_number: "我方案号".to_string(),
            sequence: "序号".to_string(),
        }
    }
}

/// A worksheet column, written in the config file by its letters, e.g. `"D"`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LedgerColumn(u32);

impl LedgerColumn {
    /// Parses column letters such as `"D"` or `"AA"`.
    pub fn parse(letters: &str) -> Res<Self> {
        Ok(Self(column_index(letters.trim())?))
    }

    /// The 1-based column index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl Serialize for LedgerColumn {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&column_letters(self.0))
    }
}

impl<'de> Deserialize<'de> for LedgerColumn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LedgerColumn::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Where each field of an invoice request lands in the ledger worksheet.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LedgerLayout {
    pub invoice_type: LedgerColumn,
    pub applicant: LedgerColumn,
    pub case_reference: LedgerColumn,
    /// Both columns receive the fee of the row's invoice type
    pub fee: [LedgerColumn; 2],
    pub grand_total: LedgerColumn,
    /// The company label is repeated in each of these
    pub company: [LedgerColumn; 3],
    pub office: LedgerColumn,
    pub date: LedgerColumn,
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            invoice_type: LedgerColumn(1),
            applicant: LedgerColumn(2),
            case_reference: LedgerColumn(3),
            fee: [LedgerColumn(4), LedgerColumn(5)],
            grand_total: LedgerColumn(6),
            company: [LedgerColumn(7), LedgerColumn(8), LedgerColumn(9)],
            office: LedgerColumn(10),
            date: LedgerColumn(11),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("invoicer_home");
        let config = Config::create(&home_dir, None, None).unwrap();

        assert!(config.config_path().is_file());
        assert!(config.root().join(TEMPLATES).is_dir());
        assert!(config.output_dir().is_dir());
        assert_eq!(config.company_label(), "深佳");
        assert_eq!(config.office_label(), "专利代理部");
        assert_eq!(config.billing_format(), BillingFormat::Word);
        assert_eq!(
            config.billing_template(),
            config.root().join("templates/billing.docx")
        );

        let loaded = Config::load(&home_dir).unwrap();
        assert_eq!(loaded.config_file, config.config_file);
    }

    #[test]
    fn test_config_create_copies_templates() {
        let dir = TempDir::new().unwrap();
        let billing = dir.path().join("请款单模板.xlsx");
        let ledger = dir.path().join("发票申请表.xlsx");
        utils::write(&billing, "billing").unwrap();
        utils::write(&ledger, "ledger").unwrap();

        let config =
            Config::create(dir.path().join("home"), Some(&billing), Some(&ledger)).unwrap();
        assert_eq!(config.billing_format(), BillingFormat::Excel);
        assert_eq!(
            utils::read(&config.billing_template()).unwrap(),
            "billing".to_string()
        );
        assert!(config.billing_template().ends_with("templates/billing.xlsx"));
        assert_eq!(
            utils::read(&config.ledger_template()).unwrap(),
            "ledger".to_string()
        );
    }

    #[test]
    fn test_config_create_rejects_unknown_template() {
        let dir = TempDir::new().unwrap();
        let billing = dir.path().join("template.pdf");
        utils::write(&billing, "x").unwrap();
        assert!(Config::create(dir.path().join("home"), Some(&billing), None).is_err());
    }

    #[test]
    fn test_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("invoicer init"));
    }

    #[test]
    fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "invoicer",
            "config_version": 1,
            "company_label": "集佳",
            "columns": { "official_fee": "官方费用" },
            "ledger_layout": { "fee": ["M", "N"] }
        }"#;
        utils::write(&config_path, json).unwrap();

        let config = ConfigFile::load(&config_path).unwrap();
        assert_eq!(config.company_label, "集佳");
        assert_eq!(config.office_label, DEFAULT_OFFICE_LABEL);
        assert_eq!(config.columns.official_fee, "官方费用");
        assert_eq!(config.columns.agency_fee, "代理费");
        assert_eq!(config.ledger_layout.fee[0].index(), 13);
        assert_eq!(config.ledger_layout.date.index(), 11);
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{ "app_name": "tiller", "config_version": 1 }"#;
        utils::write(&config_path, json).unwrap();

        let result = ConfigFile::load(&config_path);
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[test]
    fn test_config_file_bad_column_letters() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{ "app_name": "invoicer", "config_version": 1,
            "ledger_layout": { "date": "K1" } }"#;
        utils::write(&config_path, json).unwrap();
        assert!(ConfigFile::load(&config_path).is_err());
    }

    #[test]
    fn test_config_file_save_and_load() {
        let t = TempDir::new().unwrap();
        let path = t.path().join("file.json");
        let original = ConfigFile {
            billing_format: BillingFormat::Excel,
            output_dir: PathBuf::from("/tmp/bills"),
            ..ConfigFile::default()
        };
        original.save(&path).unwrap();
        let json = utils::read(&path).unwrap();
        assert!(json.contains(r#""invoice_type": "A""#));
        assert!(json.contains(r#""billing_format": "excel""#));

        let read = ConfigFile::load(&path).unwrap();
        assert_eq!(original, read);
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::create(dir.path().join("home"), None, None).unwrap();
        config.config_file.output_dir = PathBuf::from("/srv/bills");
        assert_eq!(config.output_dir(), PathBuf::from("/srv/bills"));
    }
}
