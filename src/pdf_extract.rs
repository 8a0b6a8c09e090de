// src/pdf_extract.rs

use crate::error::{Error, Result};
use crate::lines::{PageTokens, PositionedToken};
use ::pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use lopdf::Document;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, info, warn};

/// Share of image-only pages above which the document is reported as scanned.
const SCANNED_RATIO: f64 = 0.8;

/// Read positioned words from every page of a PDF.
///
/// `x_tolerance` is the horizontal gap that separates two glyphs into two
/// words. Scanned documents are not an error; they simply yield no tokens.
pub fn extract_tokens(pdf_bytes: &[u8], x_tolerance: f64) -> Result<Vec<PageTokens>> {
    // structural pass with lopdf
    let doc = Document::load_mem(pdf_bytes).map_err(|e| Error::Pdf(format!("{e}")))?;
    if looks_like_scanned(&doc) {
        warn!("PDF looks scanned / image-only; expect no order lines");
    }

    let text_doc = ::pdf_extract::Document::load_mem(pdf_bytes)
        .map_err(|e| Error::Pdf(format!("{e}")))?;
    let mut collector = TokenCollector::new(x_tolerance);

    // pdf-extract can panic on malformed content streams
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        ::pdf_extract::output_doc(&text_doc, &mut collector)
    }));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(Error::Pdf(e.to_string())),
        Err(_) => return Err(Error::PdfPanicked),
    }

    let pages = collector.finish();
    info!(
        pages = pages.len(),
        tokens = pages.iter().map(|p| p.tokens.len()).sum::<usize>(),
        "Positioned tokens extracted"
    );
    Ok(pages)
}

/// A page whose resources hold images but no fonts is image-only.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let image_only = pages
        .values()
        .filter(|&&id| {
            let resources = doc
                .get_dictionary(id)
                .ok()
                .and_then(|page| page.get(b"Resources").ok())
                .and_then(|r| doc.dereference(r).ok())
                .and_then(|(_, r)| r.as_dict().ok());
            has_entries(doc, resources, b"XObject") && !has_entries(doc, resources, b"Font")
        })
        .count();

    let ratio = image_only as f64 / pages.len() as f64;
    debug!(
        total_pages = pages.len(),
        image_only,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );
    ratio >= SCANNED_RATIO
}

fn has_entries(doc: &Document, resources: Option<&lopdf::Dictionary>, key: &[u8]) -> bool {
    resources
        .and_then(|res| res.get(key).ok())
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
        .is_some_and(|d| !d.is_empty())
}

#[derive(Debug)]
struct WordBuf {
    text: String,
    x0: f64,
    top: f64,
    baseline: f64,
    end_x: f64,
    size: f64,
}

/// `OutputDev` that groups glyphs into words with their top-left position.
struct TokenCollector {
    x_tolerance: f64,
    page_top: f64,
    current: PageTokens,
    word: Option<WordBuf>,
    pages: Vec<PageTokens>,
}

impl TokenCollector {
    fn new(x_tolerance: f64) -> Self {
        Self {
            x_tolerance,
            page_top: 0.0,
            current: PageTokens::default(),
            word: None,
            pages: Vec::new(),
        }
    }

    fn flush_word(&mut self) {
        if let Some(word) = self.word.take() {
            let text = word.text.trim();
            if !text.is_empty() {
                self.current
                    .tokens
                    .push(PositionedToken::new(text, word.top, word.x0));
            }
        }
    }

    fn push_glyph(&mut self, text: &str, x: f64, y: f64, advance: f64, size: f64) {
        if text.chars().all(char::is_whitespace) {
            self.flush_word();
            return;
        }

        let breaks = match &self.word {
            Some(w) => {
                (w.baseline - y).abs() > w.size.max(size) * 0.5
                    || x - w.end_x > self.x_tolerance
                    || x + self.x_tolerance < w.x0
            }
            None => false,
        };
        if breaks {
            self.flush_word();
        }

        let page_top = self.page_top;
        let word = self.word.get_or_insert_with(|| WordBuf {
            text: String::new(),
            x0: x,
            top: page_top - (y + size),
            baseline: y,
            end_x: x,
            size,
        });
        word.text.push_str(text);
        word.end_x = x + advance;
    }

    fn finish(mut self) -> Vec<PageTokens> {
        self.flush_word();
        if !self.current.tokens.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.pages
    }
}

impl OutputDev for TokenCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> std::result::Result<(), OutputError> {
        self.page_top = media_box.ury;
        self.current = PageTokens {
            number: page_num,
            tokens: Vec::new(),
        };
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        self.flush_word();
        let page = std::mem::take(&mut self.current);
        debug!(page = page.number, tokens = page.tokens.len(), "Page read");
        self.pages.push(page);
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> std::result::Result<(), OutputError> {
        let scale = (trm.m11 * trm.m22 - trm.m12 * trm.m21).abs().sqrt();
        let size = if scale > 0.0 { font_size * scale } else { font_size };
        self.push_glyph(char, trm.m31, trm.m32, width * size, size);
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        self.flush_word();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes() {
        let result = extract_tokens(b"this is not a pdf", 3.0);
        assert!(matches!(result, Err(Error::Pdf(_))));
    }

    #[test]
    fn test_collector_splits_words_on_space_and_gap() {
        let mut c = TokenCollector::new(3.0);
        c.page_top = 800.0;
        for (i, ch) in "ab".chars().enumerate() {
            c.push_glyph(&ch.to_string(), 10.0 + i as f64 * 5.0, 700.0, 5.0, 10.0);
        }
        c.push_glyph(" ", 20.0, 700.0, 3.0, 10.0);
        c.push_glyph("c", 23.0, 700.0, 5.0, 10.0);
        // large gap, same baseline
        c.push_glyph("d", 100.0, 700.0, 5.0, 10.0);
        // next line
        c.push_glyph("e", 10.0, 680.0, 5.0, 10.0);
        let pages = c.finish();

        let words: Vec<_> = pages[0].tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["ab", "c", "d", "e"]);
        assert_eq!(pages[0].tokens[0].top, 90.0);
        assert_eq!(pages[0].tokens[3].top, 110.0);
        assert_eq!(pages[0].tokens[2].x0, 100.0);
    }
}
