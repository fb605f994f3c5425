//! Routing and pattern matching over elements

use crate::arena::{Arena, Bundle, ElemType};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::pattern::{match_pattern, MatchResult};
use crate::stackops::Composer;
use crate::tag::{TypeTag, TYPETAG_ID};

impl Arena {
    /// Compare the rightmost string items of the two top elements for
    /// byte equality and push a 0/1 flag above them.
    pub fn match_strings(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), (o2, _)] = self.top_elems::<2>(b)?;
        let loc1 = self.nth_item_from_end(o1, 1)?;
        let loc2 = self.nth_item_from_end(o2, 1)?;
        let equal = self.read_cstr(loc1.item_off)? == self.read_cstr(loc2.item_off)?;
        self.push_i32(b, equal as i32)
    }

    /// Evaluate the string below as an OSC pattern against the address
    /// string on top.
    ///
    /// Consumes both and leaves, bottom to top: the unmatched remainder
    /// of the pattern, the matched prefix, the pattern-complete flag and
    /// the address-complete flag.
    pub fn pmatch(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), (o2, _)] = self.top_elems::<2>(b)?;
        let loc1 = self.nth_item_from_end(o1, 1)?;
        let loc2 = self.nth_item_from_end(o2, 1)?;
        let pattern = self.read_str(loc1.item_off)?.to_owned();
        let address = self.read_str(loc2.item_off)?.to_owned();
        let m = match_pattern(&pattern, &address);
        self.drop_elem(b)?;
        self.push_i32(b, (pattern.len() - m.pattern_consumed) as i32)?;
        self.decatenate_string_from_end(b)?;
        self.pop(b)?;
        self.swap(b)?;
        self.push_i32(b, m.result.contains(MatchResult::PATTERN_COMPLETE) as i32)?;
        self.push_i32(b, m.result.contains(MatchResult::ADDRESS_COMPLETE) as i32)
    }

    /// The address argument of a routing operation: the top message's
    /// rightmost string item, or its address when the payload carries no
    /// string.
    fn routing_address(&self, elem_off: usize) -> Result<String, VmError> {
        match self.nth_item_from_end(elem_off, 1) {
            Ok(loc) => {
                let tag = TypeTag::from_byte(self.read_u8(loc.tt_off)?)?;
                if tag.is_string() {
                    return Ok(self.read_str(loc.item_off)?.to_owned());
                }
                Ok(self.read_str(elem_off + 4)?.to_owned())
            }
            Err(VmError::Status(Status::ItemCount)) => {
                Ok(self.read_str(elem_off + 4)?.to_owned())
            }
            Err(e) => Err(e),
        }
    }

    /// Collect the child element offsets of the bundle element at `o`.
    fn child_offsets(&self, o: usize) -> Result<Vec<(usize, usize)>, VmError> {
        let s = self.elem_size(o)?;
        let mut children = Vec::new();
        let mut child = o + 4 + BUNDLE_HEADER_LEN;
        while child < o + 4 + s {
            let cs = self.elem_size(child)?;
            children.push((child, cs));
            child += cs + 4;
        }
        Ok(children)
    }

    /// Route the bundle below through the address on top: produce a
    /// bundle of the elements whose (pattern) addresses match it, each
    /// with the matched prefix stripped. The source bundle stays; the
    /// address message is consumed.
    pub fn route(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), (o2, _)] = self.top_elems::<2>(b)?;
        if self.elem_type(o1)? != ElemType::Bundle || self.elem_type(o2)? != ElemType::Message {
            return Err(Status::ElemType.into());
        }
        let address = self.routing_address(o2)?;
        let children = self.child_offsets(o1)?;
        let result = self.end_of(b)?;
        self.push_bundle(b)?;
        for (child, _) in children {
            let pattern = self.read_str(child + 4)?.to_owned();
            let m = match_pattern(&pattern, &address);
            if m.result.contains(MatchResult::ADDRESS_COMPLETE) {
                self.route_elem(child, m.pattern_consumed, b)?;
            }
        }
        let end = self.end_of(b)?;
        self.write_i32(result, (end - result - 4) as i32)?;
        self.nip(b)
    }

    /// Route the bundle below through every string item of the message
    /// on top, producing one bundle of per-address route results followed
    /// by a delegation bundle of the unmatched elements. Consumes both
    /// arguments.
    pub fn route_with_delegation(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        if self.elem_type(o1)? != ElemType::Bundle || self.elem_type(o2)? != ElemType::Message {
            return Err(Status::ElemType.into());
        }
        let addresses = self.string_items(o2)?;
        let children = self.child_offsets(o1)?;
        let mut matched = vec![false; children.len()];

        let outer = self.end_of(b)?;
        self.push_bundle(b)?;
        for address in addresses.iter().rev() {
            let sub = self.end_of(b)?;
            self.push_bundle(b)?;
            for (i, &(child, _)) in children.iter().enumerate() {
                let pattern = self.read_str(child + 4)?.to_owned();
                let m = match_pattern(&pattern, address);
                if m.result.contains(MatchResult::ADDRESS_COMPLETE) {
                    self.route_elem(child, m.pattern_consumed, b)?;
                    matched[i] = true;
                }
            }
            let end = self.end_of(b)?;
            self.write_i32(sub, (end - sub - 4) as i32)?;
        }
        let delegation = self.end_of(b)?;
        self.push_bundle(b)?;
        for (i, &(child, _)) in children.iter().enumerate() {
            if !matched[i] {
                self.copy_elem_at(child, b)?;
            }
        }
        let end = self.end_of(b)?;
        self.write_i32(delegation, (end - delegation - 4) as i32)?;
        let end = self.end_of(b)?;
        self.write_i32(outer, (end - outer - 4) as i32)?;
        // consume the source bundle and the address message
        self.copy_within(outer..end, o1);
        let new_size = self.bundle_size(b)? - (s1 + s2 + 8);
        let total = self.bundle_total(b)?;
        self.fill(b.0 + new_size, b.0 + new_size + (s1 + s2 + 8) + 4, 0);
        self.write_i32(b.size_field(), new_size as i32)?;
        self.write_i32(b.0 + new_size, (total - new_size) as i32)
    }

    /// Gather the elements of the bundle below whose addresses match any
    /// string item of the message on top, without prefix stripping, plus
    /// a delegation bundle of the rest. Consumes both arguments.
    pub fn gather(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        if self.elem_type(o1)? != ElemType::Bundle || self.elem_type(o2)? != ElemType::Message {
            return Err(Status::ElemType.into());
        }
        let addresses = self.string_items(o2)?;
        let children = self.child_offsets(o1)?;
        let mut matched = vec![false; children.len()];

        let gathered = self.end_of(b)?;
        self.push_bundle(b)?;
        for address in addresses.iter().rev() {
            for (i, &(child, _)) in children.iter().enumerate() {
                let pattern = self.read_str(child + 4)?.to_owned();
                let m = match_pattern(&pattern, address);
                if m.result.contains(MatchResult::ADDRESS_COMPLETE) {
                    self.copy_elem_at(child, b)?;
                    matched[i] = true;
                }
            }
        }
        let end = self.end_of(b)?;
        self.write_i32(gathered, (end - gathered - 4) as i32)?;
        let delegation = self.end_of(b)?;
        self.push_bundle(b)?;
        for (i, &(child, _)) in children.iter().enumerate() {
            if !matched[i] {
                self.copy_elem_at(child, b)?;
            }
        }
        let end = self.end_of(b)?;
        self.write_i32(delegation, (end - delegation - 4) as i32)?;
        let end = self.end_of(b)?;
        // consume the source bundle and the address message
        self.copy_within(gathered..end, o1);
        let new_size = self.bundle_size(b)? - (s1 + s2 + 8);
        let total = self.bundle_total(b)?;
        self.fill(b.0 + new_size, b.0 + new_size + (s1 + s2 + 8) + 4, 0);
        self.write_i32(b.size_field(), new_size as i32)?;
        self.write_i32(b.0 + new_size, (total - new_size) as i32)
    }

    /// Select items (or children) of the element below by the int32
    /// ordinals carried by the message on top. Consumes both and leaves
    /// the selection.
    pub fn nth(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), (o2, _)] = self.top_elems::<2>(b)?;
        if self.elem_type(o2)? != ElemType::Message {
            return Err(Status::ElemType.into());
        }
        let indices = self.int_items(o2)?;
        match self.elem_type(o1)? {
            ElemType::Message => {
                let tt_start = o1 + 4 + self.padded_str_len(o1 + 4)?;
                let ntt = self.str_len(tt_start)?;
                if ntt <= 1 {
                    return self.drop_elem(b);
                }
                let mut items = Vec::new();
                let mut item = tt_start + padded_len(ntt);
                for i in 1..ntt {
                    let tag = self.read_u8(tt_start + i)?;
                    let width = self.typed_size(tag, item)?;
                    items.push((tag, item, width));
                    item += width;
                }
                let mut picked = Vec::new();
                for &idx in &indices {
                    let item = *items
                        .get(idx as usize)
                        .ok_or(VmError::from(Status::Range))?;
                    picked.push(item);
                }
                let payload: usize = picked.iter().map(|&(_, _, w)| w).sum();
                let new_size = ANON_ADDRESS_SIZE + padded_len(1 + picked.len()) + payload;
                self.ensure_space(b, new_size + 4)?;

                let scratch = self.end_of(b)?;
                let mut w = Composer::at(scratch);
                w.put_i32(self, new_size as i32)?;
                w.put_padded_str(self, ANON_ADDRESS)?;
                w.put_u8(self, TYPETAG_ID)?;
                for &(tag, _, _) in &picked {
                    w.put_u8(self, tag)?;
                }
                w.terminate_pad(self)?;
                for &(_, off, width) in &picked {
                    w.put_copy(self, off..off + width)?;
                }
                let len = w.len();
                self.commit_scratch(b, o1, len)
            }
            ElemType::Bundle => {
                let children = self.child_offsets(o1)?;
                if children.is_empty() {
                    return self.drop_elem(b);
                }
                let mut picked = Vec::new();
                for &idx in &indices {
                    let child = *children
                        .get(idx as usize)
                        .ok_or(VmError::from(Status::Range))?;
                    picked.push(child);
                }
                let content: usize = picked.iter().map(|&(_, s)| s + 4).sum();
                let new_size = BUNDLE_HEADER_LEN + content;
                self.ensure_space(b, new_size + 4)?;

                let scratch = self.end_of(b)?;
                let mut w = Composer::at(scratch);
                w.put_i32(self, new_size as i32)?;
                w.put_bytes(self, BUNDLE_ID)?;
                w.put_bytes(self, &[0u8; 8])?;
                for &(off, size) in &picked {
                    w.put_copy(self, off..off + size + 4)?;
                }
                let len = w.len();
                self.commit_scratch(b, o1, len)
            }
        }
    }

    /// Every payload item of the message at `o`, required to be strings.
    fn string_items(&self, o: usize) -> Result<Vec<String>, VmError> {
        let tt_start = o + 4 + self.padded_str_len(o + 4)?;
        let ntt = self.str_len(tt_start)?;
        let mut out = Vec::new();
        let mut item = tt_start + padded_len(ntt);
        for i in 1..ntt {
            let tag = TypeTag::from_byte(self.read_u8(tt_start + i)?)?;
            if !tag.is_string() {
                return Err(Status::ItemType.into());
            }
            out.push(self.read_str(item)?.to_owned());
            item += self.typed_size(tag.to_byte(), item)?;
        }
        Ok(out)
    }

    /// Every payload item of the message at `o`, required to be int32s.
    fn int_items(&self, o: usize) -> Result<Vec<i32>, VmError> {
        let tt_start = o + 4 + self.padded_str_len(o + 4)?;
        let ntt = self.str_len(tt_start)?;
        let mut out = Vec::new();
        let mut item = tt_start + padded_len(ntt);
        for i in 1..ntt {
            let tag = TypeTag::from_byte(self.read_u8(tt_start + i)?)?;
            if tag != TypeTag::Int32 {
                return Err(Status::ItemType.into());
            }
            let v = self.read_i32(item)?;
            if v < 0 {
                return Err(Status::Range.into());
            }
            out.push(v);
            item += 4;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stackops::Item;

    fn stack() -> (Arena, Bundle) {
        let a = Arena::with_capacity(8192).unwrap();
        let b = a.working().unwrap();
        (a, b)
    }

    fn routed_bundle(a: &mut Arena, b: Bundle) {
        a.push_message(b, "/foo/one", &[Item::I32(1)]).unwrap();
        a.push_message(b, "/foo/two", &[Item::I32(2)]).unwrap();
        a.push_message(b, "/bar/three", &[Item::I32(3)]).unwrap();
        a.push_i32(b, 3).unwrap();
        a.bundle_from_top(b).unwrap();
    }

    #[test]
    fn match_compares_string_items() {
        let (mut a, b) = stack();
        a.push_string(b, "/x").unwrap();
        a.push_string(b, "/x").unwrap();
        a.match_strings(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 1);
        a.push_string(b, "/y").unwrap();
        a.match_strings(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 0);
    }

    #[test]
    fn pmatch_splits_the_pattern_and_flags() {
        let (mut a, b) = stack();
        a.push_string(b, "/foo/bar").unwrap();
        a.push_string(b, "/foo").unwrap();
        a.pmatch(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 1); // address complete
        assert_eq!(a.pop_i32(b).unwrap(), 0); // pattern not complete
        assert_eq!(a.pop_string(b).unwrap(), "/foo"); // matched prefix
        assert_eq!(a.pop_string(b).unwrap(), "/bar"); // remainder
    }

    #[test]
    fn route_strips_the_matched_prefix() {
        let (mut a, b) = stack();
        routed_bundle(&mut a, b);
        a.push_string(b, "/foo").unwrap();
        a.route(b).unwrap();
        assert_eq!(a.elem_count(b).unwrap(), 2);
        let o = a.last_elem_offset(b).unwrap();
        assert_eq!(a.elem_type(o).unwrap(), ElemType::Bundle);
        let children = a.child_offsets(o).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(a.read_str(children[0].0 + 4).unwrap(), "/one");
        assert_eq!(a.read_str(children[1].0 + 4).unwrap(), "/two");
    }

    #[test]
    fn route_with_delegation_keeps_the_rest() {
        let (mut a, b) = stack();
        routed_bundle(&mut a, b);
        a.push_message(b, "", &[Item::Str("/foo")]).unwrap();
        a.route_with_delegation(b).unwrap();
        assert_eq!(a.elem_count(b).unwrap(), 1);
        let o = a.last_elem_offset(b).unwrap();
        let subs = a.child_offsets(o).unwrap();
        assert_eq!(subs.len(), 2);
        // routed matches first, delegation last
        assert_eq!(a.child_offsets(subs[0].0).unwrap().len(), 2);
        let delegated = a.child_offsets(subs[1].0).unwrap();
        assert_eq!(delegated.len(), 1);
        assert_eq!(a.read_str(delegated[0].0 + 4).unwrap(), "/bar/three");
    }

    #[test]
    fn gather_copies_without_stripping() {
        let (mut a, b) = stack();
        routed_bundle(&mut a, b);
        a.push_message(b, "", &[Item::Str("/bar")]).unwrap();
        a.gather(b).unwrap();
        assert_eq!(a.elem_count(b).unwrap(), 2);
        let [(g, _), (d, _)] = a.top_elems::<2>(b).unwrap();
        let gathered = a.child_offsets(g).unwrap();
        assert_eq!(gathered.len(), 1);
        assert_eq!(a.read_str(gathered[0].0 + 4).unwrap(), "/bar/three");
        assert_eq!(a.child_offsets(d).unwrap().len(), 2);
    }

    #[test]
    fn nth_selects_items_by_ordinal() {
        let (mut a, b) = stack();
        a.push_message(b, "/m", &[Item::I32(10), Item::Str("x"), Item::I32(30)])
            .unwrap();
        a.push_message(b, "", &[Item::I32(2), Item::I32(0)]).unwrap();
        a.nth(b).unwrap();
        assert_eq!(a.elem_count(b).unwrap(), 1);
        let o = a.last_elem_offset(b).unwrap();
        assert_eq!(a.elem_item_count(o).unwrap(), 2);
        let loc = a.nth_item_from_end(o, 2).unwrap();
        assert_eq!(a.read_i32(loc.item_off).unwrap(), 30);
        let loc = a.nth_item_from_end(o, 1).unwrap();
        assert_eq!(a.read_i32(loc.item_off).unwrap(), 10);
    }

    #[test]
    fn nth_selects_children_of_a_bundle() {
        let (mut a, b) = stack();
        routed_bundle(&mut a, b);
        a.push_message(b, "", &[Item::I32(1)]).unwrap();
        a.nth(b).unwrap();
        let o = a.last_elem_offset(b).unwrap();
        let children = a.child_offsets(o).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(a.read_str(children[0].0 + 4).unwrap(), "/foo/two");
    }
}
