//! Entry and attribute name validation
//!
//! ## Rules
//!
//! - An identifier is `[A-Za-z_][A-Za-z0-9_]*`
//! - An entry name is one or more identifiers joined by `.`
//! - An attribute name is a single identifier and may not shadow an
//!   instance envelope field (see `RESERVED_ATTRIBUTE_NAMES`)
//! - When prefix checking is on, an entry name must equal an allowed prefix
//!   or start with `<prefix>.`

use ontopack_core::{SchemaError, SchemaResult};

/// Attribute names that collide with instance envelope fields
pub const RESERVED_ATTRIBUTE_NAMES: &[&str] = &[
    "id", "pack", "type", "begin", "end", "parent", "child", "members", "payload",
];

/// Prefix allowed when no other prefixes are configured
pub const DEFAULT_PREFIX: &str = "ft.onto";

/// Whether `s` is a single identifier
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a dotted entry name
pub fn validate_entry_name(name: &str) -> SchemaResult<()> {
    if name.is_empty() {
        return Err(SchemaError::InvalidIdentifier {
            name: name.to_string(),
            reason: "entry name cannot be empty".to_string(),
        });
    }
    for segment in name.split('.') {
        if !is_identifier(segment) {
            return Err(SchemaError::InvalidIdentifier {
                name: name.to_string(),
                reason: format!("segment '{}' is not an identifier", segment),
            });
        }
    }
    Ok(())
}

/// Validate an attribute name declared on `entry`
///
/// The reserved-name check always runs; `check_identifier` controls the
/// identifier syntax check.
pub fn validate_attribute_name(entry: &str, name: &str, check_identifier: bool) -> SchemaResult<()> {
    if check_identifier && !is_identifier(name) {
        return Err(SchemaError::InvalidIdentifier {
            name: name.to_string(),
            reason: format!("attribute of {} is not an identifier", entry),
        });
    }
    if RESERVED_ATTRIBUTE_NAMES.contains(&name) {
        return Err(SchemaError::ReservedAttribute {
            entry: entry.to_string(),
            attribute: name.to_string(),
        });
    }
    Ok(())
}

/// Check that `name` falls under one of `allowed`
pub fn validate_prefix(name: &str, allowed: &[String]) -> SchemaResult<()> {
    let matches = allowed.iter().any(|prefix| {
        name == prefix
            || (name.len() > prefix.len()
                && name.starts_with(prefix.as_str())
                && name.as_bytes()[prefix.len()] == b'.')
    });
    if matches {
        Ok(())
    } else {
        let mut allowed = allowed.to_vec();
        allowed.sort();
        Err(SchemaError::DisallowedPrefix {
            entry: name.to_string(),
            allowed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("Token"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("pos_tag2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("has-dash"));
        assert!(!is_identifier("has space"));
    }

    #[test]
    fn test_entry_name_segments() {
        assert!(validate_entry_name("ft.onto.base_ontology.Token").is_ok());
        assert!(matches!(
            validate_entry_name("ft..Token"),
            Err(SchemaError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            validate_entry_name("ft.onto.9Token"),
            Err(SchemaError::InvalidIdentifier { .. })
        ));
        assert!(validate_entry_name("").is_err());
    }

    #[test]
    fn test_reserved_attribute_names() {
        for name in RESERVED_ATTRIBUTE_NAMES {
            let err = validate_attribute_name("ft.onto.Token", name, true).unwrap_err();
            assert!(matches!(err, SchemaError::ReservedAttribute { .. }));
        }
        assert!(validate_attribute_name("ft.onto.Token", "pos", true).is_ok());
    }

    #[test]
    fn test_attribute_identifier_check_can_be_disabled() {
        assert!(validate_attribute_name("ft.onto.Token", "not valid", true).is_err());
        assert!(validate_attribute_name("ft.onto.Token", "not valid", false).is_ok());
    }

    #[test]
    fn test_prefix_requires_segment_boundary() {
        let allowed = vec!["ft.onto".to_string()];
        assert!(validate_prefix("ft.onto.Token", &allowed).is_ok());
        assert!(validate_prefix("ft.onto", &allowed).is_ok());
        assert!(validate_prefix("ft.ontology.Token", &allowed).is_err());
        assert!(matches!(
            validate_prefix("custom.Token", &allowed),
            Err(SchemaError::DisallowedPrefix { .. })
        ));
    }
}
