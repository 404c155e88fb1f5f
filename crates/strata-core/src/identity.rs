//! Deterministic node identity (C1).
//!
//! A node id is derived from its (title, labels) pair so that re-ingesting the
//! same artifact twice always resolves to the same row. Code symbols that
//! need sub-title granularity (a function nested in a file) bypass the
//! (title, labels) hash and instead hash a caller-built canonical string
//! through the same primitive.

use md5::{Digest, Md5};

const ID_LEN: usize = 16;

/// Computes the 16-hex-character id for (title, labels).
///
/// Labels are sorted lexicographically before hashing so that label order
/// never affects identity (§3 Identity invariant, §8 "ID purity").
pub fn node_id(title: &str, labels: &[&str]) -> String {
    let mut sorted_labels: Vec<&str> = labels.to_vec();
    sorted_labels.sort_unstable();
    let canonical = format!("{title}:{}", sorted_labels.join(","));
    hash_canonical(&canonical)
}

/// Computes the id for a code symbol from its file path, qualified name, and
/// label, bypassing the (title, labels) hash (§3: "allows external callers to
/// supply an overriding id only for sub-symbol code nodes").
pub fn code_symbol_id(file_path: &str, qualified_name: &str, label: &str) -> String {
    let canonical = format!("{file_path}:{qualified_name}|{label}");
    hash_canonical(&canonical)
}

/// Hashes an already-canonicalized string and truncates to [`ID_LEN`] hex
/// characters. Exposed so adapters with their own canonicalization rules
/// (e.g. a custom symbol key) can still land on an id from the same scheme.
pub fn hash_canonical(canonical: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let hex = hex_encode(&digest);
    hex[..ID_LEN].to_string()
}

/// Content hash used by the incremental AST adapter's `body_hash` skip check
/// (§4.6, §8 "Incremental AST"), and by sleep's DEDUP phase for content-hash
/// equality when titles don't match exactly.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_and_label_order_independent() {
        let a = node_id("ADR-007: Use an embedded store", &["Decision", "ADR"]);
        let b = node_id("ADR-007: Use an embedded store", &["ADR", "Decision"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn id_is_idempotent_across_calls() {
        let a = node_id("same title", &["Concept"]);
        let b = node_id("same title", &["Concept"]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_titles_or_labels_differ() {
        let a = node_id("title one", &["Concept"]);
        let b = node_id("title two", &["Concept"]);
        let c = node_id("title one", &["Pattern"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn code_symbol_id_is_distinct_from_title_hash() {
        let symbol = code_symbol_id("src/cache.rs", "Cache::evict", "Function");
        let title = node_id("Cache::evict", &["Function"]);
        assert_ne!(symbol, title);
        assert_eq!(symbol.len(), ID_LEN);
    }

    #[test]
    fn content_hash_detects_single_byte_changes() {
        let a = content_hash("fn evict() {}");
        let b = content_hash("fn evict() { }");
        assert_ne!(a, b);
    }
}
