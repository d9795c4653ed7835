//! S1: single-threaded sweep (spec.md §8).
//!
//! Grounded on the teacher's `tests/gc_allocation.rs`, scaled down from
//! the teacher's thousand-object sweep to a size that still exercises
//! the same retain-every-fourth shape without needing a multi-megabyte
//! arena.

mod common;

use common::{leaf_klass, reference_array_klass, Classes, NoMethods};
use squawk_core::config::RuntimeConfig;
use squawk_core::memory::address::Address;
use squawk_core::memory::raw;
use squawk_core::object::layout::Layout;
use squawk_core::Vm;

const TOTAL: usize = 100;
const RETAIN_EVERY: usize = 4;

/// spec.md §8 S1: create `TOTAL` 1-word instances, retain every fourth in
/// an array, drop references to the rest, request a collection. Free
/// memory must grow by roughly `TOTAL * 3 / 4` objects' worth of bytes,
/// and the retained quarter must still be reachable with field contents
/// intact.
#[test]
fn collection_reclaims_unretained_instances_and_keeps_the_rest_intact() {
    let leaf_class = Address::new(0x10);
    let array_class = Address::new(0x20);
    let mut classes = Classes::default();
    classes.0.insert(leaf_class, leaf_klass(1));
    classes.0.insert(array_class, reference_array_klass(2));

    let mut vm =
        Vm::new(1 << 16, 256, 64, RuntimeConfig::default(), classes, NoMethods).unwrap();

    let retained_count = TOTAL.div_ceil(RETAIN_EVERY);
    let array = vm.allocate(array_class, Layout::Array, retained_count, Some(retained_count as u64)).unwrap();
    let array_root = vm.roots_mut().register(array);

    let mut retained_slot = 0usize;
    for i in 0..TOTAL {
        let obj = vm.allocate(leaf_class, Layout::Instance, 1, None).unwrap();
        raw::write_word(vm.memory_mut().arena_mut(), obj, 0, i as u64);
        if i % RETAIN_EVERY == 0 {
            raw::write_word(vm.memory_mut().arena_mut(), array, retained_slot, obj.as_usize() as u64);
            retained_slot += 1;
        }
    }
    assert_eq!(retained_slot, retained_count);

    let before_ap = vm.memory().allocation_pointer();
    let report = vm.request_collection(true).unwrap();
    assert!(report.full);

    let after_ap = vm.memory().allocation_pointer();
    let reclaimed = before_ap.diff(after_ap).as_bytes();
    let expected = ((TOTAL - retained_count) * 2 * 8) as isize; // header + 1 body word per unretained leaf
    assert_eq!(reclaimed, expected, "reclaimed bytes must match exactly the unretained leaves' footprint");

    let array = vm.roots_mut().get(array_root).unwrap();
    for slot in 0..retained_count {
        let elem = raw::read_word(vm.memory().arena(), array, slot);
        let elem_addr = Address::new(elem as usize);
        let value = raw::read_word(vm.memory().arena(), elem_addr, 0);
        assert_eq!(value, (slot * RETAIN_EVERY) as u64, "retained object's field contents must survive unchanged");
    }
}

/// A collection with nothing rooted reclaims the entire young generation.
#[test]
fn collection_with_no_roots_reclaims_everything() {
    let leaf_class = Address::new(0x10);
    let mut classes = Classes::default();
    classes.0.insert(leaf_class, leaf_klass(1));
    let mut vm = Vm::new(4096, 256, 64, RuntimeConfig::default(), classes, NoMethods).unwrap();

    for _ in 0..20 {
        vm.allocate(leaf_class, Layout::Instance, 1, None).unwrap();
    }
    let report = vm.collect_garbage(true);
    assert_eq!(report.objects_marked, 0);
    assert_eq!(vm.memory().allocation_pointer(), vm.memory().heap_start());
}
