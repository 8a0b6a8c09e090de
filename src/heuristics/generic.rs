use super::{DimensionCounts, DimensionMode, DimensionParse, Grammar, ProductHeader};
use tracing::warn;

const SEPARATOR: &str = " - ";

/// Product line -> header. The order quantity is the last `N ks` token on
/// the line; it is cut out before the category/name split so it never ends
/// up in either.
pub(super) fn product_header(g: &Grammar, line: &str, tag: String) -> ProductHeader {
    let (multiplier, rest) = take_order_quantity(g, line);

    let (category, name, pack) = match rest.split_once(SEPARATOR) {
        Some((category, raw)) => {
            let (name, pack) = name_and_pack(g, raw);
            (collapse_ws(category), name, pack)
        }
        None => (collapse_ws(&rest), String::new(), 1),
    };

    ProductHeader {
        category,
        name,
        pack,
        tag,
        multiplier,
    }
}

fn take_order_quantity(g: &Grammar, line: &str) -> (u32, String) {
    let Some(cap) = g.quantity_re.captures_iter(line).last() else {
        return (1, line.to_string());
    };
    let Some(whole) = cap.get(0) else {
        return (1, line.to_string());
    };
    let qty = cap[1].parse::<u32>().unwrap_or(1).max(1);

    let mut rest = String::with_capacity(line.len());
    rest.push_str(&line[..whole.start()]);
    rest.push(' ');
    rest.push_str(&line[whole.end()..]);
    (qty, rest)
}

/// Free-text suffix -> (display name, pack size). Never fails.
pub(super) fn name_and_pack(g: &Grammar, raw: &str) -> (String, u32) {
    let pack = g
        .quantity_re
        .captures(raw)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(1);

    let without_pack = g.quantity_re.replace_all(raw, " ");
    let without_price = g.price_re.replace(&without_pack, "");
    (collapse_ws(&without_price), pack)
}

/// Explicit `<n> x <W/L>` tokens first; bare labels only when there are none.
pub(super) fn dimensions(g: &Grammar, line: &str, multiplier: u32) -> DimensionParse {
    let mut counts = DimensionCounts::new();
    let mut explicit = false;

    for cap in g.explicit_re.captures_iter(line) {
        explicit = true;
        let Ok(n) = cap[1].parse::<u64>() else {
            warn!(token = &cap[0], "Unreadable dimension count, skipped");
            continue;
        };
        let slot = counts.entry(cap[2].to_string()).or_insert(0);
        *slot = slot.saturating_add(n);
    }
    if explicit {
        return DimensionParse {
            mode: DimensionMode::Explicit,
            counts,
        };
    }

    for m in g.bare_re.find_iter(line) {
        let slot = counts.entry(m.as_str().to_string()).or_insert(0);
        *slot = slot.saturating_add(u64::from(multiplier));
    }
    DimensionParse {
        mode: DimensionMode::Fallback,
        counts,
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
