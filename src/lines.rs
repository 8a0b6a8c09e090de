// src/lines.rs

use std::collections::BTreeMap;

/// A word emitted by the PDF text layer together with its position.
///
/// `top` is the distance from the top edge of the page, so larger values
/// are further down.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    pub text: String,
    pub top: f64,
    pub x0: f64,
}

impl PositionedToken {
    pub fn new(text: impl Into<String>, top: f64, x0: f64) -> Self {
        Self {
            text: text.into(),
            top,
            x0,
        }
    }
}

/// All tokens of one page, in content-stream order.
#[derive(Debug, Clone, Default)]
pub struct PageTokens {
    pub number: u32,
    pub tokens: Vec<PositionedToken>,
}

/// Group tokens into logical lines by rounding `top` to the nearest multiple
/// of `tolerance`.
///
/// Tokens inside one line keep their source order; they are not re-sorted
/// by `x0`. Lines come out top to bottom. A larger tolerance merges nearby
/// rows, a smaller one may split a single visual row.
pub fn build_lines(tokens: &[PositionedToken], tolerance: f64) -> Vec<String> {
    let mut rows: BTreeMap<i64, Vec<&str>> = BTreeMap::new();

    for token in tokens {
        // ties go to the even multiple
        let bucket = (token.top / tolerance).round_ties_even() as i64;
        rows.entry(bucket).or_default().push(token.text.as_str());
    }

    rows.into_values()
        .map(|words| words.join(" ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, top: f64, x0: f64) -> PositionedToken {
        PositionedToken::new(text, top, x0)
    }

    #[test]
    fn test_groups_by_quantized_top() {
        let tokens = vec![
            tok("rozmery:", 120.4, 10.0),
            tok("obliečky", 99.0, 10.0),
            tok("-", 99.9, 60.0),
            tok("saténové", 98.7, 70.0),
            tok("1x", 121.0, 60.0),
            tok("70/90", 119.8, 80.0),
        ];
        assert_eq!(
            build_lines(&tokens, 3.0),
            vec!["obliečky - saténové", "rozmery: 1x 70/90"]
        );
    }

    #[test]
    fn test_keeps_source_order_within_line() {
        let tokens = vec![tok("right", 50.0, 300.0), tok("left", 50.5, 10.0)];
        assert_eq!(build_lines(&tokens, 3.0), vec!["right left"]);
    }

    #[test]
    fn test_tolerance_controls_merging() {
        let tokens = vec![tok("a", 10.0, 0.0), tok("b", 14.0, 0.0)];
        assert_eq!(build_lines(&tokens, 3.0), vec!["a", "b"]);
        assert_eq!(build_lines(&tokens, 10.0), vec!["a b"]);
    }

    #[test]
    fn test_ties_round_to_even() {
        // 4.5 / 3 = 1.5 -> 2, 1.5 / 3 = 0.5 -> 0
        let tokens = vec![tok("x", 4.5, 0.0), tok("y", 1.5, 0.0), tok("z", 6.0, 0.0)];
        assert_eq!(build_lines(&tokens, 3.0), vec!["y", "x z"]);
    }

    #[test]
    fn test_drops_blank_lines() {
        let tokens = vec![tok("  ", 10.0, 0.0), tok("text", 40.0, 0.0)];
        assert_eq!(build_lines(&tokens, 3.0), vec!["text"]);
    }

    #[test]
    fn test_deterministic() {
        let tokens: Vec<_> = (0..50)
            .map(|i| tok(&format!("w{i}"), (i % 7) as f64 * 4.1, i as f64))
            .collect();
        assert_eq!(build_lines(&tokens, 3.0), build_lines(&tokens, 3.0));
    }
}
