//! Resolver configuration loaded from TOML

use crate::common::*;
use ontopack::{Error, ResolverConfig, SchemaError, SchemaResolver};

#[test]
fn test_strict_prefixes_from_toml() {
    init_tracing();
    let config = ResolverConfig::from_toml_str(
        r#"
        lenient_prefix = false
        allowed_prefixes = ["ft.onto"]
        "#,
    )
    .unwrap();
    assert!(config.validate_identifiers);

    let mut resolver = SchemaResolver::with_config(config.clone());
    resolver.add_json(BASE_ONTOLOGY).unwrap();
    let table = resolver.resolve().unwrap();
    assert!(table.get(TOKEN).is_some());

    let mut resolver = SchemaResolver::with_config(config);
    resolver
        .add_json(r#"{ "definitions": [ { "entry_name": "org.other.Thing" } ] }"#)
        .unwrap();
    let err: Error = resolver.resolve().unwrap_err().into();
    assert!(matches!(
        err,
        Error::Schema(SchemaError::DisallowedPrefix { ref entry, .. }) if entry == "org.other.Thing"
    ));
}
