//! Per-frame oop-map driven stack-chunk scanning (spec.md §4.5.1 step 3).
//!
//! No direct teacher analogue — ZGC has no VM-managed activation stacks.
//! Grounded directly in spec.md's description: for each frame, consult
//! the method's parameter/local oop map to find reference slots.

use crate::chunks::stack_chunk::StackChunk;
use crate::memory::address::{Address, UWord};
use crate::object::klass::{MethodRef, OopMap};

/// Supplies the per-method oop map the stack scanner needs. An external
/// collaborator in the full VM (the class loader / translator, spec.md
/// §6); this crate only needs the read side.
pub trait MethodMetadataProvider {
    fn oop_map(&self, method: MethodRef) -> &OopMap;
}

/// Visit every reference slot (a nonzero word interpreted as an
/// [`Address`]) in every frame of `chunk`, per spec.md §4.5.1 step 3.
/// Meta-region slots (`owner`, `lastFP`) carry no heap references in this
/// crate's `ThreadId`/index-based representation, so there is nothing
/// else to scan beyond the frame bodies.
pub fn scan_chunk<F: FnMut(Address)>(
    chunk: &StackChunk,
    metadata: &dyn MethodMetadataProvider,
    mut visit: F,
) {
    for frame in &chunk.frames {
        let oop_map = metadata.oop_map(frame.method);
        for (i, &slot) in frame.slots.iter().enumerate() {
            if oop_map.is_reference_slot(i) && slot != 0 {
                visit(Address::new(slot as usize));
            }
        }
    }
}

/// Rewrite every reference slot in `chunk` for which `rewrite` returns a
/// new address (phase 3, spec.md §4.5.3). Also used by phase 3 to fix up
/// `previous_fp`/`previous_ip` via the method's displacement, handled by
/// the caller since that needs the *method's* forwarding, not a slot's.
pub fn update_chunk<F: FnMut(Address) -> Option<Address>>(
    chunk: &mut StackChunk,
    metadata: &dyn MethodMetadataProvider,
    mut rewrite: F,
) {
    for frame in &mut chunk.frames {
        let oop_map = metadata.oop_map(frame.method).clone();
        for (i, slot) in frame.slots.iter_mut().enumerate() {
            if oop_map.is_reference_slot(i) && *slot != 0 {
                if let Some(new_addr) = rewrite(Address::new(*slot as usize)) {
                    *slot = new_addr.as_usize() as UWord;
                }
            }
        }
    }
}

/// Phase 3's method/return-address fixup (spec.md §4.5.3 "previous-FP and
/// previous-IP in each frame must be adjusted"): a frame's own `method`
/// slot is a reference like any other and is forwarded directly; its
/// `previous_ip` is a derived address into the *caller*'s bytecode, so it
/// must shift by however far the caller's method body moved, not by its
/// own. `previous_fp` needs no adjustment here — it is a frame index into
/// this same chunk, not an arena address.
pub fn update_method_linkage<F: Fn(Address) -> Option<Address>>(chunk: &mut StackChunk, forward: F) {
    let displacement: Vec<Option<crate::memory::address::Offset>> = chunk
        .frames
        .iter()
        .map(|f| forward(f.method.0).map(|new_addr| new_addr.diff(f.method.0)))
        .collect();

    for frame in chunk.frames.iter_mut() {
        if let Some(new_addr) = forward(frame.method.0) {
            frame.method = MethodRef(new_addr);
        }
        if let Some(previous_fp) = frame.previous_fp {
            if let Some(Some(disp)) = displacement.get(previous_fp) {
                frame.previous_ip = frame.previous_ip.add(*disp);
            }
        }
    }
}
