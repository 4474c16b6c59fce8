//! Concurrent access tests for ontopack-store
//!
//! These tests run real threads against shared packs and the registry:
//!
//! 1. **Independent Packs** - packs mutate in parallel without interference
//! 2. **Shared Pack** - writers serialize through the pack lock, ids stay unique
//! 3. **Readers** - queries run concurrently with each other
//! 4. **Registry** - concurrent link creation across a fixed set of packs
//!
//! ## Running These Tests
//!
//! ```bash
//! cargo test --test concurrency_tests
//! ```

use ontopack_core::{EntryId, EntryRef};
use ontopack_schema::{SchemaResolver, TypeTable};
use ontopack_store::{EntryFields, MultiPackRegistry, Pack};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

// ============================================================================
// Test Helpers
// ============================================================================

const TOKEN: &str = "ft.onto.base_ontology.Token";
const ENTITY: &str = "ft.onto.base_ontology.EntityMention";
const RELATION: &str = "ft.onto.base_ontology.CrossDocEntityRelation";

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

fn table() -> Arc<TypeTable> {
    let mut resolver = SchemaResolver::new();
    resolver
        .add_json(include_str!("../../schema/tests/fixtures/base_ontology.json"))
        .unwrap();
    Arc::new(resolver.resolve().unwrap())
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_independent_packs_in_parallel() {
    let table = table();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let table = Arc::clone(&table);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut pack = Pack::new(table);
                pack.set_text("a".repeat(PER_THREAD + 1)).unwrap();
                barrier.wait();
                for i in 0..PER_THREAD {
                    pack.add(TOKEN, EntryFields::span(i, i + 1)).unwrap();
                }
                pack.query(TOKEN, None).unwrap().count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), PER_THREAD);
    }
}

#[test]
fn test_shared_pack_writers_get_unique_ids() {
    let mut pack = Pack::new(table());
    pack.set_text("a".repeat(PER_THREAD + 1)).unwrap();
    let pack = pack.into_shared();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pack = Arc::clone(&pack);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|i| pack.write().add(TOKEN, EntryFields::span(i, i + 1)).unwrap())
                    .collect::<Vec<EntryId>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "id {} issued twice", id);
        }
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    assert_eq!(pack.read().len(), THREADS * PER_THREAD);
}

#[test]
fn test_concurrent_readers() {
    let mut pack = Pack::new(table());
    pack.set_text("a".repeat(200)).unwrap();
    for i in 0..100 {
        pack.add(TOKEN, EntryFields::span(i * 2, i * 2 + 1)).unwrap();
    }
    let pack = pack.into_shared();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pack = Arc::clone(&pack);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let guard = pack.read();
                let lo = t * 10;
                guard.query(TOKEN, Some(lo..lo + 20)).unwrap().count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
}

#[test]
fn test_registry_concurrent_links() {
    let registry = Arc::new(MultiPackRegistry::new(table()));
    let mut mentions = Vec::new();
    for _ in 0..4 {
        let pack = registry.create_pack().unwrap();
        let mut p = pack.write();
        p.set_text("Paris").unwrap();
        let id = p.add(ENTITY, EntryFields::span(0, 5)).unwrap();
        mentions.push(EntryRef::new(p.id(), id));
    }
    let mentions = Arc::new(mentions);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let mentions = Arc::clone(&mentions);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|i| {
                        // Alternate direction so lock order is exercised both ways
                        let (p, c) = if (t + i) % 2 == 0 { (0, 1) } else { (1, 0) };
                        let p = (p + t) % mentions.len();
                        let c = (c + t + 1) % mentions.len();
                        registry.add_link(RELATION, mentions[p], mentions[c]).unwrap()
                    })
                    .collect::<Vec<EntryId>>()
            })
        })
        .collect();

    let mut links = HashSet::new();
    for handle in handles {
        links.extend(handle.join().unwrap());
    }
    assert_eq!(links.len(), THREADS * PER_THREAD);
    assert_eq!(registry.link_count(), THREADS * PER_THREAD);

    for link in links {
        registry.remove_link(link).unwrap();
    }
    for m in mentions.iter() {
        registry.unregister_pack(m.pack).unwrap();
    }
    assert!(registry.is_empty());
}
