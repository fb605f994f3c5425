use osc_vm::consts::*;
use osc_vm::prelude::*;

fn stack() -> (Arena, Bundle) {
    let a = Arena::with_capacity(8192).unwrap();
    let b = a.working().unwrap();
    (a, b)
}

fn snapshot(a: &Arena, b: Bundle) -> Vec<u8> {
    let end = b.base() + a.bundle_size(b).unwrap();
    a.bytes(b.base()..end).to_vec()
}

fn ints(a: &Arena, b: Bundle) -> Vec<i32> {
    let size = a.bundle_size(b).unwrap();
    let mut out = Vec::new();
    let mut o = b.base() + BUNDLE_HEADER_LEN;
    while o < b.base() + size {
        let loc = a.nth_item_from_end(o, 1).unwrap();
        out.push(a.read_i32(loc.item_off).unwrap());
        o += a.elem_size(o).unwrap() + 4;
    }
    out
}

#[test]
fn dup_drop_is_identity() {
    let (mut a, b) = stack();
    a.push_i32(b, 1).unwrap();
    a.push_string(b, "x").unwrap();
    let before = snapshot(&a, b);
    a.dup(b).unwrap();
    a.drop_elem(b).unwrap();
    assert_eq!(snapshot(&a, b), before);
}

#[test]
fn swap_swap_is_identity() {
    let (mut a, b) = stack();
    a.push_i32(b, 1).unwrap();
    a.push_string(b, "a wider element than the int").unwrap();
    let before = snapshot(&a, b);
    a.swap(b).unwrap();
    a.swap(b).unwrap();
    assert_eq!(snapshot(&a, b), before);
}

#[test]
fn over_equals_swap_dup_notrot() {
    let (mut a, b) = stack();
    for v in [1, 2] {
        a.push_i32(b, v).unwrap();
    }
    let mut alt = a.clone();
    a.over(b).unwrap();
    alt.swap(b).unwrap();
    alt.dup(b).unwrap();
    alt.notrot(b).unwrap();
    assert_eq!(ints(&a, b), ints(&alt, b));
    assert_eq!(ints(&a, b), [1, 2, 1]);
}

#[test]
fn tuck_equals_swap_over() {
    let (mut a, b) = stack();
    for v in [1, 2] {
        a.push_i32(b, v).unwrap();
    }
    let mut alt = a.clone();
    a.tuck(b).unwrap();
    alt.swap(b).unwrap();
    alt.over(b).unwrap();
    assert_eq!(ints(&a, b), ints(&alt, b));
    assert_eq!(ints(&a, b), [2, 1, 2]);
}

#[test]
fn rot_three_times_is_identity() {
    let (mut a, b) = stack();
    for v in [1, 2, 3] {
        a.push_i32(b, v).unwrap();
    }
    let before = snapshot(&a, b);
    a.rot(b).unwrap();
    a.rot(b).unwrap();
    a.rot(b).unwrap();
    assert_eq!(snapshot(&a, b), before);
}

#[test]
fn two_swap_twice_is_identity() {
    let (mut a, b) = stack();
    a.push_i32(b, 1).unwrap();
    a.push_string(b, "two").unwrap();
    a.push_blob(b, &[3]).unwrap();
    a.push_i32(b, 4).unwrap();
    let before = snapshot(&a, b);
    a.two_swap(b).unwrap();
    a.two_swap(b).unwrap();
    assert_eq!(snapshot(&a, b), before);
}

#[test]
fn notrot_undoes_rot() {
    let (mut a, b) = stack();
    for v in [1, 2, 3] {
        a.push_i32(b, v).unwrap();
    }
    let before = snapshot(&a, b);
    a.rot(b).unwrap();
    a.notrot(b).unwrap();
    assert_eq!(snapshot(&a, b), before);
}

#[test]
fn bundle_all_unpack_is_identity() {
    let (mut a, b) = stack();
    a.push_i32(b, 1).unwrap();
    a.push_message(b, "/m", &[Item::Str("s"), Item::I32(2)]).unwrap();
    a.push_blob(b, &[7; 6]).unwrap();
    let before = snapshot(&a, b);
    a.bundle_all(b).unwrap();
    a.unpack(b).unwrap();
    assert_eq!(snapshot(&a, b), before);
}

#[test]
fn push_pop_is_identity_for_non_bundle_items() {
    let (mut a, b) = stack();
    a.push_message(b, "/m", &[Item::I32(9)]).unwrap();
    a.push_blob(b, &[1, 2, 3]).unwrap();
    let before = snapshot(&a, b);
    a.push(b).unwrap();
    a.pop(b).unwrap();
    assert_eq!(snapshot(&a, b), before);
}

#[test]
fn scenario_add_leaves_three() {
    let (mut a, b) = stack();
    a.push_i32(b, 1).unwrap();
    a.push_i32(b, 2).unwrap();
    a.add(b).unwrap();
    assert_eq!(a.elem_count(b).unwrap(), 1);
    assert_eq!(a.pop_i32(b).unwrap(), 3);
    assert!(a.bundle_is_empty(b).unwrap());
}

#[test]
fn scenario_swap_keeps_addresses_and_widths() {
    let (mut a, b) = stack();
    a.push_message(b, "/bar", &[Item::I32(1)]).unwrap();
    a.push_message(b, "/foo", &[Item::I32(2)]).unwrap();
    let size = a.bundle_size(b).unwrap();
    a.swap(b).unwrap();
    assert_eq!(a.bundle_size(b).unwrap(), size);
    assert_eq!(a.peek_address(b).unwrap(), "/bar");
    assert_eq!(a.peek_i32(b).unwrap(), 1);
    a.drop_elem(b).unwrap();
    assert_eq!(a.peek_address(b).unwrap(), "/foo");
    assert_eq!(a.peek_i32(b).unwrap(), 2);
}

#[test]
fn scenario_pick_match_copies_and_flags() {
    let (mut a, b) = stack();
    a.push_message(b, "/a", &[Item::I32(1)]).unwrap();
    a.push_message(b, "/b", &[Item::I32(2)]).unwrap();
    a.push_string(b, "/a").unwrap();
    a.pick_match(b).unwrap();
    assert_eq!(a.pop_i32(b).unwrap(), 1);
    assert_eq!(a.peek_address(b).unwrap(), "/a");
    assert_eq!(a.peek_i32(b).unwrap(), 1);
    assert_eq!(a.elem_count(b).unwrap(), 3);
}

#[test]
fn clear_leaves_an_empty_bundle_with_full_free_tail() {
    let (mut a, b) = stack();
    let free = a.space_available(b).unwrap();
    for v in 0..10 {
        a.push_i32(b, v).unwrap();
    }
    a.clear_elems(b).unwrap();
    assert!(a.bundle_is_empty(b).unwrap());
    assert_eq!(a.space_available(b).unwrap(), free);
}

#[test]
fn deep_stack_churn_preserves_the_free_tail_invariant() {
    let (mut a, b) = stack();
    for v in 0..8 {
        a.push_i32(b, v).unwrap();
    }
    for _ in 0..8 {
        a.swap(b).unwrap();
        a.rot(b).unwrap();
        a.over(b).unwrap();
        a.nip(b).unwrap();
        a.tuck(b).unwrap();
        a.drop_elem(b).unwrap();
    }
    let size = a.bundle_size(b).unwrap();
    let end = a.end_of(b).unwrap();
    assert_eq!(
        a.read_i32(end).unwrap() as usize,
        a.bundle_total(b).unwrap() - size
    );
    // bytes past the free length field are zero
    let total = a.bundle_total(b).unwrap();
    assert!(a
        .bytes(end + 4..b.base() + total)
        .iter()
        .all(|&c| c == 0));
}

#[test]
fn running_out_of_space_reports_range() {
    let mut a = Arena::with_capacity(MIN_ARENA_SIZE + 64).unwrap();
    let b = a.working().unwrap();
    let mut result = Ok(());
    for _ in 0..64 {
        result = a.push_i32(b, 1);
        if result.is_err() {
            break;
        }
    }
    assert!(matches!(result, Err(VmError::Status(Status::Range))));
}
