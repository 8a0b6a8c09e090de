// src/heuristics/mod.rs

mod generic;

use crate::config::{CategoryRule, ClassifierConfig};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

/// Dimension label ("70/90") -> unit count, in order of first appearance.
pub type DimensionCounts = IndexMap<String, u64>;

/// Identity of one aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProductKey {
    pub category: String,
    pub name: String,
    pub pack: u32,
}

/// What a product line carries once the category prefix matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductHeader {
    pub category: String,
    pub name: String,
    pub pack: u32,
    pub tag: String,
    /// Order quantity read from the line; 1 when absent.
    pub multiplier: u32,
}

/// Which extraction mode produced a dimension result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionMode {
    /// `<n> x <W/L>` tokens; counts describe one unit of the product.
    Explicit,
    /// Bare `<W/L>` tokens; counts already include the order multiplier.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionParse {
    pub mode: DimensionMode,
    pub counts: DimensionCounts,
}

impl DimensionParse {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Regexes and markers compiled once from the classifier config.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<CategoryRule>,
    dimensions_marker: String,
    quantity_re: Regex,
    price_re: Regex,
    explicit_re: Regex,
    bare_re: Regex,
}

impl Grammar {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self> {
        let unit = regex::escape(cfg.unit_marker.trim());
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| Error::Config(e.to_string()));

        Ok(Self {
            rules: cfg
                .rules
                .iter()
                .map(|r| CategoryRule {
                    prefix: r.prefix.trim().to_lowercase(),
                    tag: r.tag.clone(),
                })
                .collect(),
            dimensions_marker: cfg.dimensions_marker.trim().to_lowercase(),
            quantity_re: compile(&format!(r"(?i)\b(\d+)\s*{unit}\b"))?,
            price_re: compile(r"\d+[,.]\d+\s*(?:€|Kč|EUR).*")?,
            explicit_re: compile(r"(\d+)\s*[xX×]\s*(\d+/\d+)")?,
            bare_re: compile(r"\d+/\d+")?,
        })
    }

    /// The first rule whose prefix starts the lower-cased line.
    pub fn match_rule(&self, line: &str) -> Option<&CategoryRule> {
        let lower = line.trim_start().to_lowercase();
        self.rules.iter().find(|r| lower.starts_with(&r.prefix))
    }

    pub fn is_dimensions_line(&self, line: &str) -> bool {
        line.to_lowercase().contains(&self.dimensions_marker)
    }

    /// Parse a product line. Returns `None` when no rule prefix matches.
    pub fn parse_product_line(&self, line: &str) -> Option<ProductHeader> {
        let tag = self.match_rule(line)?.tag.clone();
        Some(generic::product_header(self, line, tag))
    }

    /// Split a free-text suffix into display name and pack size.
    pub fn parse_name(&self, raw: &str) -> (String, u32) {
        generic::name_and_pack(self, raw)
    }

    pub fn parse_dimensions(&self, line: &str, multiplier: u32) -> DimensionParse {
        generic::dimensions(self, line, multiplier)
    }
}
