//! Read-only object memory registry (spec.md §4.4, §6 "Persistent suite
//! format"): the set of installed ROM suites, looked up by URL or by
//! their root object.
//!
//! No teacher analogue (ZGC has no ROM concept). `indexmap::IndexMap` is
//! used for the by-URL table, matching the teacher's own use of
//! `indexmap` for its ordered diagnostics maps — deterministic iteration
//! order matters here too, since `squawk.reloc`-style listings (spec.md
//! §6) are naturally emitted in install order.

use indexmap::IndexMap;

use crate::memory::address::Address;

/// One installed read-only object memory: a suite's URL, its root
/// object, and the parent suite it was linked against (if any). Per
/// spec.md §3 "Invariants", its class metadata contains no self-references
/// into RAM and is never part of a copied object graph.
#[derive(Debug, Clone)]
pub struct ObjectMemory {
    pub url: String,
    pub root: Address,
    pub parent_url: Option<String>,
}

#[derive(Debug, Default)]
pub struct RomRegistry {
    by_url: IndexMap<String, ObjectMemory>,
}

impl RomRegistry {
    pub fn new() -> Self {
        RomRegistry { by_url: IndexMap::new() }
    }

    /// Install a suite. Replaces any prior registration under the same
    /// URL (re-installation is the loader's concern, not validated here).
    pub fn install(&mut self, memory: ObjectMemory) {
        self.by_url.insert(memory.url.clone(), memory);
    }

    pub fn lookup_by_url(&self, url: &str) -> Option<&ObjectMemory> {
        self.by_url.get(url)
    }

    /// Look up a suite by its root object's address. Linear over
    /// installed suites — small and rarely hot (root lookups happen at
    /// suite-boundary crossings, not per allocation).
    pub fn lookup_by_root(&self, root: Address) -> Option<&ObjectMemory> {
        self.by_url.values().find(|m| m.root == root)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectMemory> {
        self.by_url.values()
    }

    pub fn count(&self) -> usize {
        self.by_url.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_then_lookup_by_url_and_root() {
        let mut reg = RomRegistry::new();
        reg.install(ObjectMemory {
            url: "squawk://suite/a".into(),
            root: Address::new(0x1000),
            parent_url: None,
        });

        assert!(reg.lookup_by_url("squawk://suite/a").is_some());
        assert!(reg.lookup_by_root(Address::new(0x1000)).is_some());
        assert!(reg.lookup_by_root(Address::new(0x2000)).is_none());
    }

    #[test]
    fn reinstalling_the_same_url_replaces_the_entry() {
        let mut reg = RomRegistry::new();
        reg.install(ObjectMemory { url: "u".into(), root: Address::new(1), parent_url: None });
        reg.install(ObjectMemory { url: "u".into(), root: Address::new(2), parent_url: None });
        assert_eq!(reg.count(), 1);
        assert_eq!(reg.lookup_by_url("u").unwrap().root, Address::new(2));
    }
}
