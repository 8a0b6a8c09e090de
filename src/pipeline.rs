// src/pipeline.rs

use crate::aggregate::{Aggregator, OrderSummary};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::heuristics::Grammar;
use crate::inventory::{self, Reconciled};
use crate::lines::{PageTokens, build_lines};
use crate::pdf_extract;
use crate::spreadsheet;
use crate::tables::{self, OrderTables};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

/// Paths written by one invocation. Owned by the caller; nothing is kept
/// between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    pub bedding: PathBuf,
    pub other: PathBuf,
    pub inventory: Option<PathBuf>,
    /// SHA-256 of the order document bytes, hex encoded.
    pub source_digest: String,
}

/// Everything computed for one invocation before anything is written.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub summary: OrderSummary,
    pub tables: OrderTables,
    pub reconciled: Option<Reconciled>,
}

pub struct Pipeline {
    cfg: Config,
    grammar: Grammar,
}

impl Pipeline {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let grammar = Grammar::new(&cfg.classifier)?;
        Ok(Self { cfg, grammar })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Logical lines per page.
    pub fn page_lines(&self, pages: &[PageTokens]) -> Vec<Vec<String>> {
        pages
            .iter()
            .map(|p| build_lines(&p.tokens, self.cfg.lines.tolerance))
            .collect()
    }

    /// Classify and aggregate already reconstructed lines, one slice per page.
    pub fn summarize_lines<P, L>(&self, pages: P) -> OrderSummary
    where
        P: IntoIterator,
        P::Item: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut classifier =
            Classifier::new(&self.grammar, self.cfg.classifier.carry_state_across_pages);
        let mut aggregator = Aggregator::new(self.cfg.tables.bedding_marker.as_str());
        let mut units = 0u64;

        for lines in pages {
            classifier.begin_page();
            for line in lines {
                if let Some(c) = classifier.feed(line.as_ref()) {
                    units = units.saturating_add(aggregator.add(c));
                }
            }
        }

        info!(
            products = aggregator.len(),
            units,
            ignored_lines = classifier.ignored(),
            "Order aggregated"
        );
        aggregator.finish()
    }

    pub fn summarize_pages(&self, pages: &[PageTokens]) -> OrderSummary {
        self.summarize_lines(self.page_lines(pages))
    }

    /// Summarize, partition and (optionally) reconcile without touching disk.
    pub fn evaluate(&self, pages: &[PageTokens], inventory: Option<&Path>) -> Result<Outcome> {
        let summary = self.summarize_pages(pages);
        let tables = tables::partition(&summary, &self.cfg.tables);

        let reconciled = match inventory {
            Some(path) => {
                let span = info_span!("inventory", file = %path.display());
                let _guard = span.enter();
                let sheet = inventory::read_inventory(path)?;
                Some(inventory::reconcile(&sheet, &summary, &self.cfg.inventory)?)
            }
            None => None,
        };

        Ok(Outcome {
            summary,
            tables,
            reconciled,
        })
    }

    /// Full run: read the order PDF (and inventory), then write every output.
    ///
    /// All computation, including inventory validation, happens before the
    /// first file is written, so a fatal error leaves the output directory
    /// untouched. Outputs default to the order document's directory.
    pub fn run(
        &self,
        order: &Path,
        inventory: Option<&Path>,
        out_dir: Option<&Path>,
    ) -> Result<(GeneratedFiles, Outcome)> {
        let span = info_span!("order", file = %order.display());
        let _guard = span.enter();

        let bytes = fs::read(order).map_err(|e| Error::io(order, e))?;
        let source_digest = format!("{:x}", Sha256::digest(&bytes));
        info!(bytes = bytes.len(), digest = %source_digest, "Order document loaded");

        let pages = pdf_extract::extract_tokens(&bytes, self.cfg.lines.x_tolerance)?;
        let outcome = self.evaluate(&pages, inventory)?;

        let dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => order.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let files = self.write(&outcome, &dir, source_digest)?;
        Ok((files, outcome))
    }

    /// Write the outcome's tables into `dir`, overwriting previous outputs.
    pub fn write(&self, outcome: &Outcome, dir: &Path, source_digest: String) -> Result<GeneratedFiles> {
        let names = &self.cfg.output;
        let bedding = dir.join(&names.bedding_file);
        let other = dir.join(&names.other_file);

        spreadsheet::write_table(&outcome.tables.bedding, &bedding)?;
        spreadsheet::write_table(&outcome.tables.other, &other)?;

        let inventory = match &outcome.reconciled {
            Some(r) => {
                let path = dir.join(&names.inventory_file);
                spreadsheet::write_table(&r.table, &path)?;
                Some(path)
            }
            None => None,
        };

        Ok(GeneratedFiles {
            bedding,
            other,
            inventory,
            source_digest,
        })
    }
}
