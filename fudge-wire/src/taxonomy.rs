//! A taxonomy is a bijection between field ordinals and field names, scoped by a 16-bit
//! taxonomy-id. A [`TaxonomyResolver`] looks one up by id; the envelope applies it to fill in
//! whichever of name/ordinal a field is missing.

use std::collections::HashMap;

/// A bijection between ordinals and names, backed by two parallel vectors.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    ordinals: Vec<i16>,
    names: Vec<String>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Taxonomy { ordinals: Vec::new(), names: Vec::new() }
    }

    /// Panics if `ordinal` or `name` is already registered; a taxonomy is a bijection.
    pub fn insert(&mut self, ordinal: i16, name: impl Into<String>) {
        let name = name.into();
        assert!(self.ordinal_for(&name).is_none(), "name {} already registered", name);
        assert!(self.name_for(ordinal).is_none(), "ordinal {} already registered", ordinal);
        self.ordinals.push(ordinal);
        self.names.push(name);
    }

    pub fn ordinal_for(&self, name: &str) -> Option<i16> {
        self.names.iter().position(|n| n == name).map(|i| self.ordinals[i])
    }

    pub fn name_for(&self, ordinal: i16) -> Option<&str> {
        self.ordinals.iter().position(|o| *o == ordinal).map(|i| self.names[i].as_str())
    }
}

/// Maps a 16-bit taxonomy-id to a [`Taxonomy`]. id 0 and unregistered ids resolve to `None`.
pub trait TaxonomyResolver {
    fn resolve(&self, id: i16) -> Option<&Taxonomy>;
}

/// A resolver backed by a fixed map, built once and immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    taxonomies: HashMap<i16, Taxonomy>,
}

impl MapResolver {
    pub fn new() -> Self {
        MapResolver { taxonomies: HashMap::new() }
    }

    pub fn register(&mut self, id: i16, taxonomy: Taxonomy) {
        self.taxonomies.insert(id, taxonomy);
    }
}

impl TaxonomyResolver for MapResolver {
    fn resolve(&self, id: i16) -> Option<&Taxonomy> {
        if id == 0 {
            return None;
        }
        self.taxonomies.get(&id)
    }
}

/// A resolver with nothing registered; envelopes never get name/ordinal rewriting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl TaxonomyResolver for NoResolver {
    fn resolve(&self, _id: i16) -> Option<&Taxonomy> {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Taxonomy {
        let mut t = Taxonomy::new();
        t.insert(1, "name");
        t.insert(2, "age");
        t
    }

    #[test]
    fn bijective_lookup() {
        let t = sample();
        assert_eq!(t.ordinal_for("name"), Some(1));
        assert_eq!(t.name_for(2), Some("age"));
    }

    #[test]
    fn unknown_keys_are_absent() {
        let t = sample();
        assert_eq!(t.ordinal_for("missing"), None);
        assert_eq!(t.name_for(99), None);
    }

    #[test]
    fn map_resolver_rejects_id_zero() {
        let mut r = MapResolver::new();
        r.register(0, sample());
        r.register(5, sample());
        assert!(r.resolve(0).is_none());
        assert!(r.resolve(5).is_some());
        assert!(r.resolve(6).is_none());
    }

    #[test]
    fn no_resolver_always_absent() {
        assert!(NoResolver.resolve(5).is_none());
    }
}
