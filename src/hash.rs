//! Stable content hashing (spec §6).
//!
//! `hash(components)` is SHA-512 over the UTF-8 concatenation of each pair
//! rendered as `"{key}={value}"` joined by `\n`, hex-encoded lower-case.
//! Every stable id in the data model (Document, TextUnit, Entity,
//! Relationship) is derived from this function, so it must be bit-identical
//! across runs and platforms given identical inputs.

use sha2::{Digest, Sha512};

/// Hash an ordered list of `(key, value)` components per the spec's wire format.
pub fn hash<'a, I>(components: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let joined = components
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut hasher = Sha512::new();
    hasher.update(joined.as_bytes());
    let digest = hasher.finalize();
    hex_lower(&digest)
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let a = hash([("path", "a.txt"), ("text", "hello")]);
        let b = hash([("path", "a.txt"), ("text", "hello")]);
        assert_eq!(a, b);
    }

    #[test]
    fn order_sensitive() {
        let a = hash([("path", "a.txt"), ("text", "hello")]);
        let b = hash([("text", "hello"), ("path", "a.txt")]);
        assert_ne!(a, b);
    }

    #[test]
    fn is_sha512_hex() {
        let h = hash([("a", "b")]);
        assert_eq!(h.len(), 128);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn empty_components() {
        let h = hash(std::iter::empty());
        assert_eq!(h.len(), 128);
    }

    #[test]
    fn value_changes_hash() {
        let a = hash([("text", "hello")]);
        let b = hash([("text", "hellp")]);
        assert_ne!(a, b);
    }
}
