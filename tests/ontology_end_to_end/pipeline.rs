//! A single document through a tagging pipeline

use crate::common::*;
use ontopack::{
    EntryFields, EntryRef, InstanceError, Pack, SchemaResolver, StructuralRole, Value,
};
use std::sync::Arc;

const TEXT: &str = "Barack Obama was born in Hawaii. He was president.";

#[test]
fn test_segment_tag_and_query() {
    let mut pack = Pack::new(base_table());
    pack.set_text(TEXT).unwrap();
    let sentences = segment(&mut pack);
    assert_eq!(sentences.len(), 2);

    // POS tagger pass over every token, sentence by sentence
    for (sentence, _) in &sentences {
        let tokens = pack.query_within(TOKEN, *sentence).unwrap().to_vec();
        for id in tokens {
            let word = pack.span_text(id).unwrap().to_string();
            let tag = match word.as_str() {
                "." => "PUNCT",
                "was" | "born" => "VERB",
                w if w.chars().next().is_some_and(char::is_uppercase) => "PROPN",
                _ => "NOUN",
            };
            pack.set_attribute(id, "pos", tag).unwrap();
        }
    }

    let (first, first_tokens) = &sentences[0];
    let words: Vec<&str> = pack
        .query_within(TOKEN, *first)
        .unwrap()
        .iter()
        .map(|id| pack.span_text(id).unwrap())
        .collect();
    assert_eq!(words, vec!["Barack", "Obama", "was", "born", "in", "Hawaii", "."]);
    assert_eq!(first_tokens.len(), words.len());

    let proper: Vec<&str> = pack
        .query(TOKEN, None)
        .unwrap()
        .iter()
        .filter(|id| pack.get_as::<String>(*id, "pos").unwrap() == "PROPN")
        .map(|id| pack.span_text(id).unwrap())
        .collect();
    assert_eq!(proper, vec!["Barack", "Obama", "Hawaii", "He"]);
}

#[test]
fn test_parse_and_coreference() {
    let mut pack = Pack::new(base_table());
    pack.set_text(TEXT).unwrap();
    let sentences = segment(&mut pack);
    let tokens = &sentences[0].1;

    // Obama <-nsubj- born, born -obl-> Hawaii
    let nsubj = pack
        .add(DEPENDENCY, EntryFields::link(tokens[3], tokens[1]))
        .unwrap();
    pack.set_attribute(nsubj, "dep_label", "nsubj").unwrap();
    let obl = pack
        .add(DEPENDENCY, EntryFields::link(tokens[3], tokens[5]))
        .unwrap();
    pack.set_attribute(obl, "dep_label", "obl").unwrap();
    pack.set_attribute(tokens[3], "is_root", true).unwrap();

    let obama = pack.add(ENTITY, EntryFields::span(0, 12)).unwrap();
    let he = pack.add(ENTITY, EntryFields::span(33, 35)).unwrap();
    pack.set_attribute(obama, "ner_type", "PERSON").unwrap();
    let chain = pack.add(COREF, EntryFields::group([obama, he])).unwrap();

    let heads: Vec<_> = pack
        .query(DEPENDENCY, None)
        .unwrap()
        .iter()
        .map(|id| pack.get(id).unwrap().link_endpoints().unwrap().0)
        .collect();
    assert_eq!(heads, vec![tokens[3], tokens[3]]);

    // Strict removal holds for links and groups alike
    for target in [tokens[1], he] {
        assert!(matches!(
            pack.remove(target),
            Err(InstanceError::ReferencedEntry { .. })
        ));
    }
    pack.remove(nsubj).unwrap();
    pack.remove(tokens[1]).unwrap();
    pack.remove(chain).unwrap();
    pack.remove(he).unwrap();

    let people: Vec<_> = pack.query(ENTITY, Some(0..50)).unwrap().to_vec();
    assert_eq!(people, vec![obama]);
}

#[test]
fn test_extension_ontology() {
    init_tracing();
    let extension = r#"{
        "ontology_name": "example_ontology",
        "additional_prefixes": ["edu.example"],
        "definitions": [
            {
                "entry_name": "edu.example.Citation",
                "parent_entry": "ft.onto.base_ontology.EntityMention",
                "attributes": [
                    { "name": "doi", "type": "str" },
                    { "name": "cited_tokens", "type": "List",
                      "item_type": "ft.onto.base_ontology.Token" }
                ]
            }
        ]
    }"#;

    let mut resolver = SchemaResolver::new();
    resolver.add_json(BASE_ONTOLOGY).unwrap();
    resolver.add_json(extension).unwrap();
    let table = Arc::new(resolver.resolve().unwrap());

    let citation = table.get("edu.example.Citation").unwrap();
    assert_eq!(citation.role(), StructuralRole::Annotation);
    assert!(citation.attribute("ner_type").is_some());
    assert!(table.is_subtype_by_name("edu.example.Citation", ENTITY));
    assert!(table
        .entry_tree()
        .find(ENTITY)
        .unwrap()
        .find("edu.example.Citation")
        .is_some());

    let mut pack = Pack::new(Arc::clone(&table));
    pack.set_text(TEXT).unwrap();
    let tokens = segment(&mut pack)[0].1.clone();
    let cite = pack
        .add("edu.example.Citation", EntryFields::span(0, 12))
        .unwrap();
    let cited: Vec<Value> = tokens[..2]
        .iter()
        .map(|t| Value::Entry(EntryRef::new(pack.id(), *t)))
        .collect();
    pack.set_attribute(cite, "cited_tokens", cited).unwrap();

    // Subtype instances are found by supertype queries
    assert_eq!(pack.query(ENTITY, None).unwrap().to_vec(), vec![cite]);
    assert!(pack.remove(tokens[0]).is_err());
}
