//! Class descriptor (Klass): the immutable metadata a loader installs for
//! every class before any instance of it is allocated (spec.md §3 "Klass",
//! §6 "Class loader / translator ↔ Core").
//!
//! A `Klass` is itself an object in the VM's object graph (spec.md treats
//! class descriptors as roots via the read-only-object-memory table), but
//! this crate models it as a plain Rust struct held behind an `Rc` rather
//! than as heap bytes — the loader/verifier that would produce the wire
//! encoding is an external collaborator (spec.md §1) outside this core.

use std::rc::Rc;

use super::layout::Layout;
use crate::memory::address::Address;

bitflags::bitflags! {
    /// Per-class modifier flags (spec.md §3 "Klass").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KlassFlags: u16 {
        const REFERENCE    = 0b0000_0001;
        const PRIMITIVE    = 0b0000_0010;
        const ARRAY        = 0b0000_0100;
        const INTERFACE    = 0b0000_1000;
        const SYNTHETIC    = 0b0001_0000;
        const DOUBLE_WORD  = 0b0010_0000;
        const HAS_FINALIZER = 0b0100_0000;
        const HAS_CLINIT   = 0b1000_0000;
        /// "squawk array" property: body is indexed as a homogeneous
        /// array (primitive arrays, reference arrays, stack chunks,
        /// class-state arrays, method bodies, strings).
        const SQUAWK_ARRAY = 0b0001_0000_0000;
    }
}

/// The static-field region of a class, split reference-first
/// (spec.md §3 "Invariants": reference-typed static fields precede the
/// primitive-typed ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticFieldSize {
    pub reference_words: u32,
    pub primitive_words: u32,
}

impl StaticFieldSize {
    pub fn total_words(self) -> u32 {
        self.reference_words + self.primitive_words
    }
}

/// One entry of an interface's method-slot map: which vtable slot on this
/// class implements a given interface method index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceSlot {
    pub interface_id: u32,
    pub method_index: u32,
    pub vtable_slot: u32,
}

/// Per-instance oop map: which words of an instance body hold references.
/// `bit i` set means word `i` of the body is a reference slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OopMap(pub Vec<bool>);

impl OopMap {
    pub fn all_primitive(words: usize) -> Self {
        OopMap(vec![false; words])
    }

    pub fn is_reference_slot(&self, word_index: usize) -> bool {
        self.0.get(word_index).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Homogeneous element kind of a squawk array class (spec.md §3 "squawk
/// array"): every element of an array-layout object is the same kind,
/// so one flag per class (rather than a per-element tag) suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayElementKind {
    /// Every element is a primitive value `words_per_element` words wide.
    Primitive { words_per_element: u32 },
    /// Every element is a one-word reference slot, scanned by G.
    Reference,
}

/// A class descriptor, installed once by the (external) loader and
/// immutable thereafter (spec.md §6).
#[derive(Debug, Clone)]
pub struct Klass {
    pub id: u32,
    pub flags: KlassFlags,
    pub super_class: Option<Rc<Klass>>,
    pub interfaces: Vec<InterfaceSlot>,
    /// Which words of an instance body are reference slots.
    pub instance_oop_map: OopMap,
    /// Instance body size in words (zero for array/method classes, whose
    /// size is per-object via the length word).
    pub instance_size_words: u32,
    pub static_fields: StaticFieldSize,
    /// Virtual method table: one entry per vtable slot. `None` marks an
    /// abstract slot with no concrete implementation.
    pub vtable: Vec<Option<MethodRef>>,
    /// Layout family of instances of this class.
    pub layout: Layout,
    /// Element kind for `Layout::Array` classes; `None` for `Instance`
    /// and `Method` classes, which have no array body to speak of.
    pub array_element_kind: Option<ArrayElementKind>,
}

/// Opaque reference to a method body; dispatch itself belongs to the
/// (external) interpreter, so this core only needs to carry the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRef(pub Address);

impl Klass {
    pub fn is_array(&self) -> bool {
        self.flags.contains(KlassFlags::ARRAY)
    }

    pub fn is_squawk_array(&self) -> bool {
        self.flags.contains(KlassFlags::SQUAWK_ARRAY)
    }

    pub fn has_finalizer(&self) -> bool {
        self.flags.contains(KlassFlags::HAS_FINALIZER)
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(KlassFlags::INTERFACE)
    }

    /// Body size in words of an array instance of this class with
    /// `length` elements. Only meaningful for `Layout::Array` classes.
    pub fn array_body_words(&self, length: u64) -> usize {
        match self.array_element_kind {
            Some(ArrayElementKind::Reference) => length as usize,
            Some(ArrayElementKind::Primitive { words_per_element }) => {
                length as usize * words_per_element as usize
            }
            None => 0,
        }
    }

    /// Walk the interface slot map for a given interface method, honoring
    /// inheritance by falling back to the superclass chain.
    pub fn resolve_interface_slot(&self, interface_id: u32, method_index: u32) -> Option<u32> {
        self.interfaces
            .iter()
            .find(|s| s.interface_id == interface_id && s.method_index == method_index)
            .map(|s| s.vtable_slot)
            .or_else(|| {
                self.super_class
                    .as_ref()
                    .and_then(|sup| sup.resolve_interface_slot(interface_id, method_index))
            })
    }
}

/// External interface from the (external) class loader/translator into
/// the core (spec.md §6 "Class loader / translator ↔ Core"): lookup of
/// an installed class's metadata by the opaque class-pointer address
/// objects carry in their header. Consulted by [`crate::gc`] during
/// marking and relocation, never by the allocator (which only ever
/// stores the pointer it is given, spec.md §4.4).
pub trait ClassMetadataProvider {
    fn klass(&self, class_ptr: Address) -> &Klass;
}
