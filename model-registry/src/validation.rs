//! Field checks shared by the REST and RPC adapters, so both surfaces reject the same requests.

use crate::{
    entity::Metadata,
    error::{RegistryError, Result},
};

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Fail with `InvalidInput` naming `field` when `value` is empty or whitespace.
pub fn require(field: &str, value: &str) -> Result<()> {
    if is_blank(value) {
        return Err(RegistryError::invalid(format!("{field} is required")));
    }
    Ok(())
}

/// Presence checks for model creation. Framework membership is checked by the service.
pub fn require_create_fields(name: &str, version: &str, framework: &str) -> Result<()> {
    require("name", name)?;
    require("version", version)?;
    require("framework", framework)
}

/// Reject blank tag names and collapse duplicates, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        if is_blank(&tag) {
            return Err(RegistryError::invalid("tag names must not be blank"));
        }
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    Ok(seen)
}

/// Split tags into usable names, deduplicated in first-seen order, and a count of blank ones.
pub fn split_tags(tags: Vec<String>) -> (Vec<String>, usize) {
    let mut kept = Vec::with_capacity(tags.len());
    let mut blank = 0;
    for tag in tags {
        if is_blank(&tag) {
            blank += 1;
        } else if !kept.contains(&tag) {
            kept.push(tag);
        }
    }
    (kept, blank)
}

pub fn validate_metadata(metadata: &Metadata) -> Result<()> {
    if metadata.keys().any(|key| is_blank(key)) {
        return Err(RegistryError::invalid("metadata keys must not be blank"));
    }
    Ok(())
}

/// Sizes arrive as signed integers on the wire and must not be negative.
pub fn size_from_wire(size: i64) -> Result<u64> {
    u64::try_from(size).map_err(|_| RegistryError::invalid("size must not be negative"))
}

/// Treat empty or whitespace-only filter values as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_blank(v))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_fields() {
        assert!(require_create_fields("bert", "1.0.0", "pytorch").is_ok());
        for (name, version, framework) in [("", "1", "onnx"), ("bert", " ", "onnx"), ("bert", "1", "")] {
            let err = require_create_fields(name, version, framework).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidInput(_)));
        }
    }

    #[test]
    fn tags_are_deduplicated_in_order() {
        let tags = normalize_tags(vec!["b".into(), "a".into(), "b".into()]).unwrap();
        assert_eq!(tags, vec!["b".to_string(), "a".to_string()]);
        assert!(normalize_tags(vec!["ok".into(), "  ".into()]).is_err());
    }

    #[test]
    fn blank_tags_are_split_off() {
        let (kept, blank) = split_tags(vec!["nlp".into(), " ".into(), "nlp".into(), "".into()]);
        assert_eq!(kept, vec!["nlp".to_string()]);
        assert_eq!(blank, 2);
        assert_eq!(split_tags(Vec::new()), (Vec::new(), 0));
    }

    #[test]
    fn metadata_keys() {
        let mut metadata = Metadata::from([("k".to_string(), String::new())]);
        assert!(validate_metadata(&metadata).is_ok());
        metadata.insert("".into(), "v".into());
        assert!(validate_metadata(&metadata).is_err());
    }

    #[test]
    fn sizes_and_filters() {
        assert_eq!(size_from_wire(42).unwrap(), 42);
        assert!(size_from_wire(-1).is_err());
        assert_eq!(non_blank(Some(" ".into())), None);
        assert_eq!(non_blank(Some("x".into())), Some("x".into()));
    }
}
