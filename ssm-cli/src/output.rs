//! Terminal-width-aware column layout, matching `listd`/`find`'s
//! non-`--long` output: short entries packed several-per-line instead
//! of one per line.

use regex::Regex;
use terminal_size::{terminal_size, Width};

/// Translates a `fnmatch`-style glob (`*`, `?`) into an anchored regex
/// and reports whether `text` matches it.
///
/// Grounded on `ssm_listd.py`/`ssm_find.py`'s use of `fnmatch.filter`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut regex_src = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex_src.push_str(".*"),
            '?' => regex_src.push('.'),
            _ => regex_src.push_str(&regex::escape(&ch.to_string())),
        }
    }
    regex_src.push('$');
    Regex::new(&regex_src).map(|re| re.is_match(text)).unwrap_or(false)
}

/// Filters `items` to those matching the `fnmatch`-style glob `pattern`.
pub fn glob_filter<'a>(items: impl IntoIterator<Item = &'a String>, pattern: &str) -> Vec<String> {
    items
        .into_iter()
        .filter(|item| glob_match(pattern, item))
        .cloned()
        .collect()
}

/// The terminal's current display width, falling back to 80 columns
/// when not attached to a terminal (matching `get_terminal_size`'s
/// behavior when stdout is redirected).
pub fn terminal_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(80)
}

/// Packs `items` into as many columns as fit in `width`, filling each
/// column top-to-bottom before moving to the next (the layout used by
/// `ls` and ports of Python's `columnize`). `padding` spaces separate
/// columns. A single empty-or-one-item input returns it unchanged.
pub fn columnize(items: &[String], width: usize, padding: usize) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }

    let colwidth = items.iter().map(String::len).max().unwrap_or(0) + padding;
    let ncols = (width / colwidth.max(1)).max(1).min(items.len());
    let nrows = items.len().div_ceil(ncols);

    let mut lines = Vec::with_capacity(nrows);
    for row in 0..nrows {
        let mut line = String::new();
        for col in 0..ncols {
            let idx = col * nrows + row;
            let Some(item) = items.get(idx) else {
                break;
            };
            line.push_str(&format!("{item:<colwidth$}"));
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_when_width_is_narrow() {
        let items = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let lines = columnize(&items, 10, 2);
        assert_eq!(lines, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn packs_multiple_columns_when_width_allows() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let lines = columnize(&items, 40, 2);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(columnize(&[], 80, 2).is_empty());
    }
}
