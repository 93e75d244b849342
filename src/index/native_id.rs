//! Native id strings.
//!
//! Sources identify items with whitespace-separated `key=value` components
//! (`scan=12`, `frame=3 scan=40`, `index=7`). A lookup that uses a different
//! key set than the list's ids can never succeed, which is almost always a
//! caller bug; [`check_find_result`] reports it once per list.

use std::collections::BTreeSet;

use super::Diagnostics;

/// `key=value` components of an id, in order; tokens without `=` are skipped
pub fn components(id: &str) -> impl Iterator<Item = (&str, &str)> {
    id.split_whitespace().filter_map(|token| token.split_once('='))
}

/// Value of `key` in `id`
pub fn value<'a>(id: &'a str, key: &str) -> Option<&'a str> {
    components(id).find(|(k, _)| *k == key).map(|(_, v)| v)
}

/// Set of keys used by `id`
pub fn keys(id: &str) -> BTreeSet<&str> {
    components(id).map(|(k, _)| k).collect()
}

/// Scan number of an id: the `scan=` component, or the whole id if it is a bare integer
pub fn scan_number(id: &str) -> Option<i64> {
    match value(id, "scan") {
        Some(v) => v.parse().ok(),
        None => id.trim().parse().ok(),
    }
}

/// Build an id from components
pub fn format<'a>(parts: impl IntoIterator<Item = (&'a str, String)>) -> String {
    parts
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Miss result of `find`, warning once when `query` and the list's first id
/// use different key sets. Always returns `size`.
pub fn check_find_result(size: usize, first_id: Option<&str>, query: &str, diagnostics: &Diagnostics) -> usize {
    let Some(first_id) = first_id else {
        return size;
    };
    let expected = keys(first_id);
    let actual = keys(query);
    if expected != actual {
        diagnostics.warn_once(&format!(
            "id format mismatch: lookup uses keys [{}] but ids in this list use keys [{}] (e.g. \"{}\")",
            join(&actual),
            join(&expected),
            first_id
        ));
    }
    size
}

fn join(keys: &BTreeSet<&str>) -> String {
    keys.iter().copied().collect::<Vec<_>>().join(", ")
}
