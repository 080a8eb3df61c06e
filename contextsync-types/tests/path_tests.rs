use contextsync_types::{
    ComponentKey, DotPath, MAX_RENAMED_SEGMENTS, is_reserved_key, renamed_reserved_key,
};

#[test]
fn parse_single_segment() {
    let path = DotPath::parse("data").unwrap();
    assert_eq!(path.len(), 1);
    assert_eq!(path.first(), "data");
    assert_eq!(path.last(), "data");
    assert!(path.rest().is_none());
}

#[test]
fn parse_nested() {
    let path = DotPath::parse("data.player.stats.level").unwrap();
    assert_eq!(path.segments(), &["data", "player", "stats", "level"]);
    assert_eq!(path.rest().unwrap().to_string(), "player.stats.level");
}

#[test]
fn empty_and_malformed_paths_rejected() {
    assert!(DotPath::parse("").is_err());
    assert!(DotPath::parse("a..b").is_err());
    assert!(DotPath::parse(".a").is_err());
    assert!(DotPath::parse("a.").is_err());
}

#[test]
fn join_appends_segment() {
    let path = DotPath::parse("a.b").unwrap().join("c");
    assert_eq!(path.to_string(), "a.b.c");
}

#[test]
fn from_segments_rejects_empty() {
    assert!(DotPath::from_segments(Vec::<String>::new()).is_err());
    assert!(DotPath::from_segments(["a", ""]).is_err());
    assert_eq!(DotPath::from_segments(["a", "b"]).unwrap().to_string(), "a.b");
}

#[test]
fn serde_as_string() {
    let path = DotPath::parse("x.y").unwrap();
    assert_eq!(serde_json::to_string(&path).unwrap(), "\"x.y\"");
    let back: DotPath = serde_json::from_str("\"x.y\"").unwrap();
    assert_eq!(back, path);
    assert!(serde_json::from_str::<DotPath>("\"\"").is_err());
}

// ── Reserved keys ────────────────────────────────────────────────

#[test]
fn reserved_key_detection() {
    assert!(is_reserved_key("value"));
    assert!(is_reserved_key("lastAccessedAt"));
    assert!(!is_reserved_key("values"));
    assert_eq!(renamed_reserved_key("size"), "_size");
}

#[test]
fn reserved_variants_without_reserved_segments_is_empty() {
    let path = DotPath::parse("a.b").unwrap();
    assert!(path.reserved_variants().is_empty());
}

#[test]
fn reserved_variants_cover_every_combination() {
    let path = DotPath::parse("value.x.metadata").unwrap();
    let variants: Vec<String> = path.reserved_variants().iter().map(ToString::to_string).collect();
    assert_eq!(variants.len(), 3);
    assert!(variants.contains(&"_value.x.metadata".to_string()));
    assert!(variants.contains(&"value.x._metadata".to_string()));
    assert!(variants.contains(&"_value.x._metadata".to_string()));
}

// ── ComponentKey ─────────────────────────────────────────────────

#[test]
fn component_key_roundtrip() {
    for key in ComponentKey::ALL {
        assert_eq!(key.as_str().parse::<ComponentKey>().unwrap(), key);
    }
    assert!("nope".parse::<ComponentKey>().is_err());
}

#[test]
fn frozen_components() {
    let frozen: Vec<_> = ComponentKey::ALL.into_iter().filter(ComponentKey::is_frozen).collect();
    assert_eq!(
        frozen,
        vec![ComponentKey::Schema, ComponentKey::Constants, ComponentKey::Manifest]
    );
}

#[test]
fn component_index_matches_canonical_order() {
    for (i, key) in ComponentKey::ALL.into_iter().enumerate() {
        assert_eq!(key.index(), i);
    }
}

// ── Reserved variants ────────────────────────────────────────────

#[test]
fn reserved_variants_cap_long_paths() {
    let path = DotPath::parse(&["value"; 33].join(".")).unwrap();
    let variants = path.reserved_variants();
    assert_eq!(variants.len(), (1 << MAX_RENAMED_SEGMENTS) - 1);
    // Segments past the cap keep their literal spelling.
    assert!(variants.iter().all(|v| v.segments()[MAX_RENAMED_SEGMENTS..]
        .iter()
        .all(|s| s == "value")));
    assert!(variants.iter().any(|v| v.segments()[..MAX_RENAMED_SEGMENTS]
        .iter()
        .all(|s| s == "_value")));
}
