use osc_vm::consts::*;
use osc_vm::pattern::{match_pattern, MatchResult};
use osc_vm::prelude::*;

fn stack() -> (Arena, Bundle) {
    let a = Arena::with_capacity(8192).unwrap();
    let b = a.working().unwrap();
    (a, b)
}

fn children(a: &Arena, o: usize) -> Vec<usize> {
    let s = a.elem_size(o).unwrap();
    let mut out = Vec::new();
    let mut c = o + 4 + BUNDLE_HEADER_LEN;
    while c < o + 4 + s {
        out.push(c);
        c += a.elem_size(c).unwrap() + 4;
    }
    out
}

#[test]
fn glob_match_table() {
    let cases = [
        ("/foo", "/foo", true),
        ("/foo", "/bar", false),
        ("/f?o", "/foo", true),
        ("/f?o", "/fooo", false),
        ("/*", "/whatever", true),
        ("/*/b", "/a/b", true),
        ("/[a-c]x", "/bx", true),
        ("/[!a-c]x", "/bx", false),
        ("/{one,two}", "/two", true),
        ("/{one,two}", "/three", false),
        ("/a/*/c", "/a/b/c", true),
    ];
    for (pattern, address, expect) in cases {
        let m = match_pattern(pattern, address);
        let full = m
            .result
            .contains(MatchResult::PATTERN_COMPLETE | MatchResult::ADDRESS_COMPLETE);
        assert_eq!(full, expect, "{pattern} vs {address}");
    }
}

#[test]
fn address_complete_respects_slash_boundaries() {
    // matches up to a component boundary only
    assert!(match_pattern("/foo/bar", "/foo")
        .result
        .contains(MatchResult::ADDRESS_COMPLETE));
    assert!(!match_pattern("/foobar", "/foo")
        .result
        .contains(MatchResult::ADDRESS_COMPLETE));
}

#[test]
fn route_produces_stripped_matches() {
    let (mut a, b) = stack();
    a.push_message(b, "/synth/freq", &[Item::F32(440.0)]).unwrap();
    a.push_message(b, "/synth/amp", &[Item::F32(0.5)]).unwrap();
    a.push_message(b, "/mixer/gain", &[Item::F32(1.0)]).unwrap();
    a.push_i32(b, 3).unwrap();
    a.bundle_from_top(b).unwrap();
    a.push_string(b, "/synth").unwrap();
    a.route(b).unwrap();

    // [source, routed]
    assert_eq!(a.elem_count(b).unwrap(), 2);
    let routed = a.last_elem_offset(b).unwrap();
    let kids = children(&a, routed);
    assert_eq!(kids.len(), 2);
    assert_eq!(a.read_str(kids[0] + 4).unwrap(), "/freq");
    assert_eq!(a.read_str(kids[1] + 4).unwrap(), "/amp");
}

#[test]
fn route_with_no_match_leaves_an_empty_bundle() {
    let (mut a, b) = stack();
    a.push_message(b, "/a", &[]).unwrap();
    a.push_i32(b, 1).unwrap();
    a.bundle_from_top(b).unwrap();
    a.push_string(b, "/zzz").unwrap();
    a.route(b).unwrap();
    let routed = a.last_elem_offset(b).unwrap();
    assert_eq!(children(&a, routed).len(), 0);
}

#[test]
fn fully_consumed_route_address_becomes_anonymous() {
    let (mut a, b) = stack();
    a.push_message(b, "/exact", &[Item::I32(1)]).unwrap();
    a.push_i32(b, 1).unwrap();
    a.bundle_from_top(b).unwrap();
    a.push_string(b, "/exact").unwrap();
    a.route(b).unwrap();
    let routed = a.last_elem_offset(b).unwrap();
    let kids = children(&a, routed);
    assert_eq!(kids.len(), 1);
    assert_eq!(a.read_str(kids[0] + 4).unwrap(), "");
}

#[test]
fn gather_and_delegation_partition_the_source() {
    let (mut a, b) = stack();
    a.push_message(b, "/keep/one", &[Item::I32(1)]).unwrap();
    a.push_message(b, "/skip/two", &[Item::I32(2)]).unwrap();
    a.push_message(b, "/keep/three", &[Item::I32(3)]).unwrap();
    a.push_i32(b, 3).unwrap();
    a.bundle_from_top(b).unwrap();
    a.push_message(b, "", &[Item::Str("/keep")]).unwrap();
    a.gather(b).unwrap();

    assert_eq!(a.elem_count(b).unwrap(), 2);
    let size = a.bundle_size(b).unwrap();
    let first = b.base() + BUNDLE_HEADER_LEN;
    let second = first + a.elem_size(first).unwrap() + 4;
    assert!(second < b.base() + size);

    let gathered = children(&a, first);
    assert_eq!(gathered.len(), 2);
    // gathered elements keep their full addresses
    assert_eq!(a.read_str(gathered[0] + 4).unwrap(), "/keep/one");
    assert_eq!(a.read_str(gathered[1] + 4).unwrap(), "/keep/three");
    let delegated = children(&a, second);
    assert_eq!(delegated.len(), 1);
    assert_eq!(a.read_str(delegated[0] + 4).unwrap(), "/skip/two");
}

#[test]
fn route_all_keeps_one_bundle_per_address() {
    let (mut a, b) = stack();
    a.push_message(b, "/a/x", &[Item::I32(1)]).unwrap();
    a.push_message(b, "/b/y", &[Item::I32(2)]).unwrap();
    a.push_i32(b, 2).unwrap();
    a.bundle_from_top(b).unwrap();
    a.push_message(b, "", &[Item::Str("/a"), Item::Str("/b")]).unwrap();
    a.route_with_delegation(b).unwrap();

    assert_eq!(a.elem_count(b).unwrap(), 1);
    let outer = a.last_elem_offset(b).unwrap();
    let subs = children(&a, outer);
    // one bundle per address plus the delegation bundle
    assert_eq!(subs.len(), 3);
    assert_eq!(children(&a, subs[2]).len(), 0);
}

#[test]
fn pmatch_flags_follow_the_matcher() {
    let (mut a, b) = stack();
    a.push_string(b, "/x/y").unwrap();
    a.push_string(b, "/x/y").unwrap();
    a.pmatch(b).unwrap();
    assert_eq!(a.pop_i32(b).unwrap(), 1);
    assert_eq!(a.pop_i32(b).unwrap(), 1);
    assert_eq!(a.pop_string(b).unwrap(), "/x/y");
    assert_eq!(a.pop_string(b).unwrap(), "");
}
