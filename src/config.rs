use crate::error::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::info;

/// Runtime configuration. Every section falls back to defaults so a missing
/// file or a partial file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lines: LinesConfig,
    pub classifier: ClassifierConfig,
    pub tables: TablesConfig,
    pub inventory: InventoryConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinesConfig {
    /// Vertical quantization step for grouping tokens into lines.
    pub tolerance: f64,
    /// Horizontal gap (in page units) that splits two glyphs into two words.
    pub x_tolerance: f64,
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            tolerance: 3.0,
            x_tolerance: 3.0,
        }
    }
}

/// One row of the category rule table: a line starting with `prefix`
/// (case-insensitive) opens a new product tagged `tag`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CategoryRule {
    pub prefix: String,
    pub tag: String,
}

impl CategoryRule {
    fn new(prefix: &str, tag: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            tag: tag.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rules: Vec<CategoryRule>,
    pub dimensions_marker: String,
    pub unit_marker: String,
    pub carry_state_across_pages: bool,
}

fn default_rules() -> Vec<CategoryRule> {
    [
        ("obliečky", "bedding"),
        ("bavlnené", "bedding"),
        ("mušelínové", "bedding"),
        ("saténové", "bedding"),
        ("krepové", "bedding"),
        ("mikroplyšové", "bedding"),
        ("prestieradlo", "sheet"),
        ("chránič", "protector"),
        ("ručník", "towel"),
        ("osuška", "towel"),
        ("uterák", "towel"),
        ("saunové", "towel"),
        ("utěrky", "kitchen"),
        ("paplón", "duvet"),
        ("paplon", "duvet"),
        ("vankúš", "pillow"),
        ("deka", "blanket"),
        ("ubrus", "tablecloth"),
        ("pleny", "baby"),
        ("plátno", "fabric"),
    ]
    .into_iter()
    .map(|(p, t)| CategoryRule::new(p, t))
    .collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            dimensions_marker: "rozmery".to_string(),
            unit_marker: "ks".to_string(),
            carry_state_across_pages: false,
        }
    }
}

/// Header labels of the generated tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableLabels {
    pub category: String,
    pub name: String,
    pub pack: String,
    pub row_total: String,
    pub sets: String,
    pub totals_row: String,
}

impl Default for TableLabels {
    fn default() -> Self {
        Self {
            category: "Typ produktu".to_string(),
            name: "Název".to_string(),
            pack: "Balení (ks)".to_string(),
            row_total: "CELKEM".to_string(),
            sets: "SETY".to_string(),
            totals_row: "CELKEM".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    /// Case-insensitive category substring that marks bedding sets.
    pub bedding_marker: String,
    /// Dimension columns kept in the bedding-set table, in output order.
    pub bedding_dimensions: Vec<String>,
    pub labels: TableLabels,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            bedding_marker: "obliečky".to_string(),
            bedding_dimensions: vec!["70/90".to_string(), "140/200".to_string()],
            labels: TableLabels::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Header written into column E when the sheet has a header row and E is blank.
    pub post_header: String,
    /// Column letter -> expected header substring. Empty disables the check.
    pub expected_headers: IndexMap<String, String>,
    /// Whether row 1 is a header. Unset means detect it from the row itself.
    pub header_row: Option<bool>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            post_header: "Po odečtu".to_string(),
            expected_headers: IndexMap::new(),
            header_row: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub bedding_file: String,
    pub other_file: String,
    pub inventory_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bedding_file: "soupis_povleceni.xlsx".to_string(),
            other_file: "soupis_ostatni_sortiment.xlsx".to_string(),
            inventory_file: "sklad_po_odecteni.xlsx".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let cfg: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        info!(path = %path.display(), rules = cfg.classifier.rules.len(), "Loaded config");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lines.tolerance > 0.0) {
            return Err(Error::Config(format!(
                "lines.tolerance must be positive, got {}",
                self.lines.tolerance
            )));
        }
        if !(self.lines.x_tolerance >= 0.0) {
            return Err(Error::Config("lines.x_tolerance must not be negative".into()));
        }
        if self.classifier.rules.is_empty() {
            return Err(Error::Config("classifier.rules must not be empty".into()));
        }
        if let Some(rule) = self.classifier.rules.iter().find(|r| r.prefix.trim().is_empty()) {
            return Err(Error::Config(format!("empty prefix for tag {:?}", rule.tag)));
        }
        for marker in [
            &self.classifier.dimensions_marker,
            &self.classifier.unit_marker,
            &self.tables.bedding_marker,
        ] {
            if marker.trim().is_empty() {
                return Err(Error::Config("markers must not be empty".into()));
            }
        }

        let label_re = Regex::new(r"^\d+/\d+$").map_err(|e| Error::Config(e.to_string()))?;
        if let Some(bad) = self
            .tables
            .bedding_dimensions
            .iter()
            .find(|d| !label_re.is_match(d))
        {
            return Err(Error::Config(format!(
                "bedding dimension {bad:?} is not of the form W/L"
            )));
        }

        for column in self.inventory.expected_headers.keys() {
            if column_index(column).is_none() {
                return Err(Error::Config(format!(
                    "inventory.expected_headers: {column:?} is not a column letter"
                )));
            }
        }
        Ok(())
    }
}

/// "A" -> 0, "B" -> 1, ... "AA" -> 26.
pub fn column_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let n = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
    Some(n - 1)
}
