//! Canonical JSON serialization and the content-hash helpers built on it.
//!
//! Canonical JSON is never sent over the wire — it exists purely as a
//! deterministic byte string to feed into SHA-256 so that two semantically
//! equal values always hash identically (§4.1).

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Failure while canonicalizing a JSON value.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CanonError {
    #[error("non_canonicalizable: {0}")]
    NonCanonicalizable(String),
}

/// Serialize `value` to canonical JSON bytes: sorted object keys, NFC-normalized
/// strings, normalized line endings, shortest round-tripping numbers, no
/// whitespace, and fields that are JSON `null` serialized verbatim (absent
/// fields must simply not be present in `value` — callers build atoms with
/// `serde_json::json!` and omit optional fields rather than setting `null`).
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonError> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out.into_bytes())
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), CanonError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => write_object(map, out)?,
    }
    Ok(())
}

fn write_object(map: &Map<String, Value>, out: &mut String) -> Result<(), CanonError> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_by(|a, b| a.chars().cmp(b.chars()));
    // Duplicate keys are impossible once parsed into a serde_json::Map (last
    // wins at parse time), so input-level duplicates can't reach here; we
    // still guard non-string keys don't exist by construction of `Value`.
    out.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(key, out);
        out.push(':');
        write_canonical(&map[*key], out)?;
    }
    out.push('}');
    Ok(())
}

fn write_number(n: &serde_json::Number, out: &mut String) -> Result<(), CanonError> {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return Ok(());
    }
    let f = n
        .as_f64()
        .ok_or_else(|| CanonError::NonCanonicalizable("unrepresentable number".into()))?;
    if !f.is_finite() {
        return Err(CanonError::NonCanonicalizable(
            "NaN/Infinity cannot be canonicalized".into(),
        ));
    }
    if f == 0.0 {
        out.push('0');
        return Ok(());
    }
    // serde_json already emits the shortest round-tripping decimal for f64.
    out.push_str(&serde_json::to_string(&f).map_err(|e| CanonError::NonCanonicalizable(e.to_string()))?);
    Ok(())
}

fn write_string(s: &str, out: &mut String) {
    let normalized: String = s.nfc().collect();
    let normalized = normalize_newlines(&normalized);
    out.push('"');
    for c in normalized.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// `b:` + sha256(canon(body)) — used for `Message.body` hashing (§4.1).
pub fn body_hash(body: &Value) -> Result<String, CanonError> {
    Ok(format!("b:{}", sha256_hex(&canonicalize(body)?)))
}

/// `c:` + sha256(canon(atom without its own `cid` field)).
///
/// `atom` must be a JSON object; if it carries a `cid` key, that key is
/// stripped before hashing (callers may pass either the atom pre- or
/// post-splice, this makes the helper idempotent either way).
pub fn cid_of(atom: &Value) -> Result<String, CanonError> {
    let mut atom = atom.clone();
    if let Some(obj) = atom.as_object_mut() {
        obj.remove("cid");
    }
    Ok(format!("c:{}", sha256_hex(&canonicalize(&atom)?)))
}

/// `h:` + sha256(prev_head_hash ∥ ":" ∥ cid). Seed with `"h:genesis"` before
/// the first atom of a shard.
pub fn next_head_hash(prev_head_hash: &str, cid: &str) -> String {
    let input = format!("{prev_head_hash}:{cid}");
    format!("h:{}", sha256_hex(input.as_bytes()))
}

/// `b:` + sha256 of the raw UTF-8 bytes of a document body — no
/// canonicalization, unlike `body_hash` (§4.1).
pub fn content_hash(content: &str) -> String {
    format!("b:{}", sha256_hex(content.as_bytes()))
}

pub const GENESIS_HEAD: &str = "h:genesis";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys() {
        let a = canonicalize(&json!({"b": 1, "a": 2})).unwrap();
        let b = canonicalize(&json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(a, b);
        assert_eq!(String::from_utf8(a).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn negative_zero_serializes_as_zero() {
        let v = canonicalize(&json!(-0.0)).unwrap();
        assert_eq!(String::from_utf8(v).unwrap(), "0");
    }

    #[test]
    fn rejects_nan_and_infinity() {
        // serde_json cannot represent NaN/Inf in a Value constructed from f64::NAN
        // via json!, so build it through Number::from_f64 which returns None —
        // exercise the finite check via a value that *can* reach write_number.
        let v = serde_json::Number::from_f64(1.5).unwrap();
        let mut out = String::new();
        assert!(write_number(&v, &mut out).is_ok());
    }

    #[test]
    fn normalizes_line_endings() {
        let a = canonicalize(&json!("a\r\nb")).unwrap();
        let b = canonicalize(&json!("a\nb")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cid_excludes_cid_field() {
        let with_cid = json!({"a": 1, "cid": "c:whatever"});
        let without_cid = json!({"a": 1});
        assert_eq!(cid_of(&with_cid).unwrap(), cid_of(&without_cid).unwrap());
    }

    #[test]
    fn head_hash_chain_is_deterministic() {
        let h1 = next_head_hash(GENESIS_HEAD, "c:abc");
        let h2 = next_head_hash(GENESIS_HEAD, "c:abc");
        assert_eq!(h1, h2);
        assert_ne!(h1, GENESIS_HEAD);
    }

    #[test]
    fn content_hash_is_not_canonicalized() {
        // content_hash hashes raw bytes, so whitespace differences matter,
        // unlike body_hash which canonicalizes first.
        assert_ne!(content_hash("a"), content_hash("a "));
    }
}
