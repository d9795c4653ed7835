//! Shared fixtures for the crate-level scenario tests (spec.md §8 S1-S6).
//!
//! Grounded on the teacher's `tests/common/mod.rs` (`GcFixture`), reworked
//! around this crate's trait-based class loader interface rather than the
//! teacher's own heap/region config.

use std::collections::HashMap;

use squawk_core::object::klass::{
    ArrayElementKind, ClassMetadataProvider, Klass, KlassFlags, MethodRef, OopMap, StaticFieldSize,
};
use squawk_core::object::layout::Layout;
use squawk_core::marker::stack_scan::MethodMetadataProvider;
use squawk_core::memory::address::Address;

/// A fixed table of installed classes, standing in for the external class
/// loader (spec.md §6).
#[derive(Default)]
pub struct Classes(pub HashMap<Address, Klass>);

impl ClassMetadataProvider for Classes {
    fn klass(&self, class_ptr: Address) -> &Klass {
        self.0.get(&class_ptr).unwrap_or_else(|| panic!("no class installed at {class_ptr}"))
    }
}

/// No method-oriented scenario touches a stack chunk, so the oop-map
/// lookup a real interpreter would need never runs.
pub struct NoMethods;

impl MethodMetadataProvider for NoMethods {
    fn oop_map(&self, _method: MethodRef) -> &OopMap {
        unreachable!("these scenarios never scan a stack chunk")
    }
}

/// An instance class with one reference-typed field at word 0, pointing
/// at instances of `target`-shaped classes.
pub fn reference_holder_klass(id: u32) -> Klass {
    Klass {
        id,
        flags: KlassFlags::REFERENCE,
        super_class: None,
        interfaces: Vec::new(),
        instance_oop_map: OopMap(vec![true]),
        instance_size_words: 1,
        static_fields: StaticFieldSize { reference_words: 0, primitive_words: 0 },
        vtable: Vec::new(),
        layout: Layout::Instance,
        array_element_kind: None,
    }
}

/// A one-word, all-primitive leaf instance class (no outgoing references).
pub fn leaf_klass(id: u32) -> Klass {
    Klass {
        id,
        flags: KlassFlags::REFERENCE,
        super_class: None,
        interfaces: Vec::new(),
        instance_oop_map: OopMap::all_primitive(1),
        instance_size_words: 1,
        static_fields: StaticFieldSize { reference_words: 0, primitive_words: 0 },
        vtable: Vec::new(),
        layout: Layout::Instance,
        array_element_kind: None,
    }
}

/// A reference-array class: every element is a one-word reference slot.
pub fn reference_array_klass(id: u32) -> Klass {
    Klass {
        id,
        flags: KlassFlags::REFERENCE | KlassFlags::ARRAY | KlassFlags::SQUAWK_ARRAY,
        super_class: None,
        interfaces: Vec::new(),
        instance_oop_map: OopMap::default(),
        instance_size_words: 0,
        static_fields: StaticFieldSize { reference_words: 0, primitive_words: 0 },
        vtable: Vec::new(),
        layout: Layout::Array,
        array_element_kind: Some(ArrayElementKind::Reference),
    }
}
