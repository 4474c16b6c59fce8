//! Shared helpers for the end-to-end suite

#![allow(dead_code)]

use ontopack::{EntryFields, EntryId, Pack, SchemaResolver, TypeTable};
use std::sync::{Arc, Once};

pub const BASE_ONTOLOGY: &str = include_str!("../../crates/schema/tests/fixtures/base_ontology.json");

pub const TOKEN: &str = "ft.onto.base_ontology.Token";
pub const SENTENCE: &str = "ft.onto.base_ontology.Sentence";
pub const ENTITY: &str = "ft.onto.base_ontology.EntityMention";
pub const DEPENDENCY: &str = "ft.onto.base_ontology.Dependency";
pub const COREF: &str = "ft.onto.base_ontology.CoreferenceGroup";
pub const RELATION: &str = "ft.onto.base_ontology.CrossDocEntityRelation";

static TRACING: Once = Once::new();

/// Route ontopack's logs through the test harness's captured output
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// The base ontology, compiled with default settings
pub fn base_table() -> Arc<TypeTable> {
    init_tracing();
    let mut resolver = SchemaResolver::new();
    resolver.add_json(BASE_ONTOLOGY).unwrap();
    Arc::new(resolver.resolve().unwrap())
}

/// Whitespace tokenizer and full-stop sentence splitter over `pack`'s text
///
/// Returns the sentence ids and, per sentence, its token ids.
pub fn segment(pack: &mut Pack) -> Vec<(EntryId, Vec<EntryId>)> {
    let text = pack.text().unwrap_or("").to_string();
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == '.' {
            let end = i + 1;
            let sentence = pack.add(SENTENCE, EntryFields::span(start, end)).unwrap();
            let tokens = tokenize(pack, &text, start, end);
            sentences.push((sentence, tokens));
            start = text[end..]
                .find(|c: char| !c.is_whitespace())
                .map_or(text.len(), |off| end + off);
        }
    }
    sentences
}

fn tokenize(pack: &mut Pack, text: &str, begin: usize, end: usize) -> Vec<EntryId> {
    let mut tokens = Vec::new();
    let mut word_start = None;
    for (i, c) in text[begin..end].char_indices() {
        let at = begin + i;
        let boundary = c.is_whitespace() || c == '.';
        match (word_start, boundary) {
            (None, false) => word_start = Some(at),
            (Some(s), true) => {
                tokens.push(pack.add(TOKEN, EntryFields::span(s, at)).unwrap());
                word_start = None;
            }
            _ => {}
        }
        if c == '.' {
            tokens.push(pack.add(TOKEN, EntryFields::span(at, at + 1)).unwrap());
        }
    }
    if let Some(s) = word_start {
        tokens.push(pack.add(TOKEN, EntryFields::span(s, end)).unwrap());
    }
    tokens
}
