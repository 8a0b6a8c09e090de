// src/classifier.rs

use crate::heuristics::{DimensionParse, Grammar, ProductHeader, ProductKey};
use tracing::{debug, trace};

/// Dimensions attributed to one product line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub key: ProductKey,
    pub tag: String,
    pub multiplier: u32,
    /// Order multiplier to add to the record's set count: the product line's
    /// multiplier on its first contributing dimensions line, 0 afterwards.
    pub sets: u32,
    pub dimensions: DimensionParse,
}

#[derive(Debug)]
struct OpenProduct {
    header: ProductHeader,
    sets_counted: bool,
}

/// Walks logical lines and turns them into contributions.
///
/// A product line opens a product; a dimensions line attributes sizes to the
/// open product. Everything else is ignored.
pub struct Classifier<'g> {
    grammar: &'g Grammar,
    carry_across_pages: bool,
    open: Option<OpenProduct>,
    ignored: usize,
}

impl<'g> Classifier<'g> {
    pub fn new(grammar: &'g Grammar, carry_across_pages: bool) -> Self {
        Self {
            grammar,
            carry_across_pages,
            open: None,
            ignored: 0,
        }
    }

    pub fn begin_page(&mut self) {
        if !self.carry_across_pages {
            self.open = None;
        }
    }

    /// Lines that were neither product lines nor attributable dimension lines.
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    pub fn feed(&mut self, line: &str) -> Option<Contribution> {
        if let Some(header) = self.grammar.parse_product_line(line) {
            debug!(
                category = %header.category,
                name = %header.name,
                pack = header.pack,
                multiplier = header.multiplier,
                "Product opened"
            );
            self.open = Some(OpenProduct {
                header,
                sets_counted: false,
            });
            return None;
        }

        if !self.grammar.is_dimensions_line(line) {
            trace!(line, "Unclassified line");
            self.ignored += 1;
            return None;
        }

        let Some(open) = self.open.as_mut() else {
            debug!(line, "Dimensions line without an open product");
            self.ignored += 1;
            return None;
        };

        let header = &open.header;
        let dimensions = self.grammar.parse_dimensions(line, header.multiplier);
        if dimensions.counts.is_empty() {
            return None;
        }

        let sets = if open.sets_counted { 0 } else { header.multiplier };
        open.sets_counted = true;

        Some(Contribution {
            key: ProductKey {
                category: header.category.clone(),
                name: header.name.clone(),
                pack: header.pack,
            },
            tag: header.tag.clone(),
            multiplier: header.multiplier,
            sets,
            dimensions,
        })
    }
}
