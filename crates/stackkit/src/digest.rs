//! Template content digests for drift detection.
//!
//! YAML documents are digested over their exact UTF-8 bytes, so a remote
//! copy that only differs in whitespace still counts as dirty. JSON
//! documents come back from CloudFormation decoded and re-encoded, so
//! they are digested over a canonical encoding (sorted keys, no
//! whitespace) instead.

use serde_json::{Map, Value};

/// Hex blake3 digest of a template document.
pub fn digest(document: &str) -> String {
    match canonical_json(document) {
        Some(canonical) => blake3::hash(canonical.as_bytes()).to_hex().to_string(),
        None => blake3::hash(document.as_bytes()).to_hex().to_string(),
    }
}

/// Whether the remote document differs from the local one.
pub fn is_dirty(remote: &str, local: &str) -> bool {
    digest(remote) != digest(local)
}

/// Compact, key-sorted encoding of a JSON object document.
///
/// Returns `None` for anything that is not a JSON object, which covers
/// every YAML template.
fn canonical_json(document: &str) -> Option<String> {
    match serde_json::from_str::<Value>(document) {
        Ok(value @ Value::Object(_)) => serde_json::to_string(&sort_keys(value)).ok(),
        _ => None,
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "AWSTemplateFormatVersion: '2010-09-09'\nResources: {}\n";

    #[test]
    fn test_identical_documents_are_clean() {
        assert!(!is_dirty(TEMPLATE, TEMPLATE));
        assert!(!is_dirty("", ""));
    }

    #[test]
    fn test_single_byte_difference_is_dirty() {
        let mut changed = TEMPLATE.as_bytes().to_vec();
        let last = changed.len() - 2;
        changed[last] = b']';
        let changed = String::from_utf8(changed).unwrap();

        assert!(is_dirty(TEMPLATE, &changed));
    }

    #[test]
    fn test_whitespace_is_not_normalized() {
        let reformatted = TEMPLATE.replace('\n', "\r\n");
        assert!(is_dirty(TEMPLATE, &reformatted));
        assert!(is_dirty(TEMPLATE, &format!("{TEMPLATE} ")));
    }

    #[test]
    fn test_json_compared_by_value() {
        let local = "{\n    \"AWSTemplateFormatVersion\": \"2010-09-09\",\n    \"Resources\": {}\n}\n";
        let reencoded = "{\n  \"Resources\": {},\n  \"AWSTemplateFormatVersion\": \"2010-09-09\"\n}";

        assert!(!is_dirty(reencoded, local));
        assert!(is_dirty(local, &local.replace("2010-09-09", "2010-09-10")));
    }

    #[test]
    fn test_json_scalars_use_raw_bytes() {
        assert!(is_dirty("1", " 1"));
    }

    #[test]
    fn test_digest_is_hex() {
        let d = digest(TEMPLATE);
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(d, digest(TEMPLATE));
    }
}
