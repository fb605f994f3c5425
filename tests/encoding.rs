use osc_vm::consts::*;
use osc_vm::prelude::*;

fn stack() -> (Arena, Bundle) {
    let a = Arena::with_capacity(8192).unwrap();
    let b = a.working().unwrap();
    (a, b)
}

/// Walk a bundle by size prefixes, returning each element offset; the
/// walk must land exactly on the declared boundary.
fn walk(a: &Arena, b: Bundle) -> Vec<usize> {
    let size = a.bundle_size(b).unwrap();
    let mut offsets = Vec::new();
    let mut o = b.base() + BUNDLE_HEADER_LEN;
    while o < b.base() + size {
        offsets.push(o);
        o += a.elem_size(o).unwrap() + 4;
    }
    assert_eq!(o, b.base() + size, "walk must terminate on the boundary");
    offsets
}

#[test]
fn parse_walk_visits_each_element_once() {
    let (mut a, b) = stack();
    a.push_i32(b, 1).unwrap();
    a.push_string(b, "a longer string payload").unwrap();
    a.push_blob(b, &[9; 13]).unwrap();
    a.push_message(b, "/m", &[Item::I32(1), Item::F32(0.5), Item::Str("x")])
        .unwrap();
    a.push_bundle(b).unwrap();
    assert_eq!(walk(&a, b).len(), 5);
}

#[test]
fn every_tag_round_trips() {
    let (mut a, b) = stack();
    let items = [
        Item::I32(-5),
        Item::F32(1.25),
        Item::F64(-2.5),
        Item::I64(1 << 40),
        Item::U32(u32::MAX),
        Item::U64(u64::MAX),
        Item::Str("str"),
        Item::Sym("sym"),
        Item::Blob(&[1, 2, 3, 4, 5]),
        Item::Timetag(7, 9),
        Item::True,
        Item::False,
        Item::Null,
        Item::Infinitum,
    ];
    a.push_message(b, "/all", &items).unwrap();
    let o = a.last_elem_offset(b).unwrap();
    assert_eq!(a.elem_item_count(o).unwrap(), items.len());
    // spot-check values through the item walker
    let loc = a.nth_item_from_end(o, items.len()).unwrap();
    assert_eq!(a.read_i32(loc.item_off).unwrap(), -5);
    let loc = a.nth_item_from_end(o, items.len() - 3).unwrap();
    assert_eq!(a.read_u64(loc.item_off).unwrap(), u64::MAX);
    let loc = a.nth_item_from_end(o, 5).unwrap();
    assert_eq!(a.read_blob(loc.item_off).unwrap(), &[1, 2, 3, 4, 5]);
    let loc = a.nth_item_from_end(o, 4).unwrap();
    assert_eq!(a.read_timetag(loc.item_off).unwrap(), (7, 9));
}

#[test]
fn strings_are_nul_terminated_and_padded() {
    let (mut a, b) = stack();
    for s in ["", "a", "abc", "abcd", "abcdefg"] {
        let o = a.end_of(b).unwrap();
        a.push_string(b, s).unwrap();
        let loc = a.nth_item_from_end(o, 1).unwrap();
        let width = a.padded_str_len(loc.item_off).unwrap();
        assert_eq!(width % 4, 0);
        assert!(width > s.len(), "room for the terminator");
        assert_eq!(a.read_str(loc.item_off).unwrap(), s);
        a.drop_elem(b).unwrap();
    }
}

#[test]
fn blob_padding_is_zeroed() {
    let (mut a, b) = stack();
    a.push_blob(b, &[0xff; 5]).unwrap();
    let loc = {
        let o = a.last_elem_offset(b).unwrap();
        a.nth_item_from_end(o, 1).unwrap()
    };
    assert_eq!(a.blob_len(loc.item_off).unwrap(), 5);
    assert_eq!(a.bytes(loc.item_off + 9..loc.item_off + 12), &[0, 0, 0]);
}

#[test]
fn size_discipline_holds_after_a_workout() {
    let (mut a, b) = stack();
    a.push_i32(b, 1).unwrap();
    a.push_string(b, "two").unwrap();
    a.push_i32(b, 3).unwrap();
    a.swap(b).unwrap();
    a.dup(b).unwrap();
    a.rot(b).unwrap();
    a.bundle_all(b).unwrap();
    a.unpack(b).unwrap();
    a.drop_elem(b).unwrap();

    let size = a.bundle_size(b).unwrap();
    let widths: usize = walk(&a, b)
        .iter()
        .map(|&o| a.elem_size(o).unwrap() + 4)
        .sum();
    assert_eq!(widths, size - BUNDLE_HEADER_LEN);
    // the free tail is intact
    let end = a.end_of(b).unwrap();
    assert_eq!(
        a.read_i32(end).unwrap() as usize,
        a.bundle_total(b).unwrap() - size
    );
}

#[test]
fn status_slot_reports_and_clears() {
    let (mut a, b) = stack();
    assert_eq!(a.status(), Status::None);
    a.set_status(Status::Range);
    assert_eq!(a.status(), Status::Range);
    a.set_status(Status::None);
    // the slot does not interfere with the working region
    a.push_i32(b, 1).unwrap();
    assert_eq!(a.pop_i32(b).unwrap(), 1);
}

#[test]
fn slip_round_trips_an_encoded_message() {
    let (mut a, b) = stack();
    a.push_message(b, "/osc", &[Item::I32(41)]).unwrap();
    let o = a.last_elem_offset(b).unwrap();
    let s = a.elem_size(o).unwrap();
    let wire = a.bytes(o + 4..o + 4 + s).to_vec();

    let framed = osc_vm::slip::encode(&wire);
    let mut decoder = SlipDecoder::new(256);
    let mut out = None;
    for byte in framed {
        if decoder.feed(byte) == SlipEvent::Frame {
            out = Some(decoder.frame().to_vec());
        }
    }
    assert_eq!(out.unwrap(), wire);
}
