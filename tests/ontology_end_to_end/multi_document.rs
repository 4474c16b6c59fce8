//! Aligning entities across documents through the registry

use crate::common::*;
use ontopack::{EntryFields, EntryRef, MultiPackRegistry, RegistryError, SharedPack};

fn mention(pack: &SharedPack, text: &str, surface: &str) -> EntryRef {
    let mut p = pack.write();
    p.set_text(text).unwrap();
    let begin = text.find(surface).unwrap();
    let id = p
        .add(ENTITY, EntryFields::span(begin, begin + surface.len()))
        .unwrap();
    EntryRef::new(p.id(), id)
}

#[test]
fn test_cross_document_alignment() {
    let registry = MultiPackRegistry::new(base_table());
    let english = registry.create_pack().unwrap();
    let german = registry.create_pack().unwrap();
    let en = mention(&english, "Angela Merkel visited Paris.", "Paris");
    let de = mention(&german, "Angela Merkel besuchte Paris.", "Paris");

    let link = registry.add_link(RELATION, en, de).unwrap();
    registry.set_link_attribute(link, "rel_type", "translation").unwrap();

    let (source, target) = registry.resolve_link(link).unwrap();
    assert_eq!(english.read().span_text(source.id()).unwrap(), "Paris");
    assert_eq!(german.read().span_text(target.id()).unwrap(), "Paris");

    assert!(matches!(
        registry.unregister_pack(en.pack),
        Err(RegistryError::PackInUse { .. })
    ));
    assert!(english.write().remove(en.entry).is_err());

    registry.remove_link(link).unwrap();
    registry.unregister_pack(en.pack).unwrap();
    assert_eq!(registry.pack_ids(), vec![de.pack]);
    english.write().remove(en.entry).unwrap();
}

#[test]
fn test_resolve_after_unregister_fails_cleanly() {
    let registry = MultiPackRegistry::new(base_table());
    let pack = registry.create_pack().unwrap();
    let r = mention(&pack, "Paris.", "Paris");

    registry.unregister_pack(r.pack).unwrap();
    assert_eq!(
        registry.resolve_ref(r).unwrap_err(),
        RegistryError::UnknownPack(r.pack)
    );
    assert!(pack.read().contains(r.entry));
}
