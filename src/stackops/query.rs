//! Queries
//!
//! Each query pushes its answer onto the bundle it inspected.

use crate::arena::{Arena, Bundle, ElemType};
use crate::consts::*;
use crate::error::VmError;
use crate::stackops::Composer;
use crate::tag::{TypeTag, TYPETAG_ID};

impl Arena {
    /// Push the number of top-level elements.
    pub fn count_elems(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.elem_count(b)?;
        self.push_i32(b, n as i32)
    }

    /// Push the item count of the top element: typetag count for a
    /// message, element count for a bundle.
    pub fn count_items(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let n = self.elem_item_count(o)?;
        self.push_i32(b, n as i32)
    }

    /// Push the content size in bytes of the top element.
    pub fn size_elem(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        self.push_i32(b, s as i32)
    }

    /// Push the encoded width of the rightmost payload item of the top
    /// message.
    pub fn size_item(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, None)?;
        let tag = self.read_u8(loc.tt_off)?;
        let s = self.typed_size(tag, loc.item_off)?;
        self.push_i32(b, s as i32)
    }

    /// Push the logical length of the rightmost payload item of the top
    /// message, padding and prefixes excluded.
    pub fn length_item(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, None)?;
        let tag = self.read_u8(loc.tt_off)?;
        let l = self.typed_len(tag, loc.item_off)?;
        self.push_i32(b, l as i32)
    }

    /// Push the encoded width of the top message's typetag string.
    pub fn size_tt(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        if self.elem_type(o)? == ElemType::Bundle {
            return Err(crate::error::Status::ElemType.into());
        }
        let tt = o + 4 + self.padded_str_len(o + 4)?;
        let width = self.padded_str_len(tt)?;
        self.push_i32(b, width as i32)
    }

    /// Push a message whose items are the addresses of the top element's
    /// children; for a message, just its address.
    pub fn get_addresses(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        if self.elem_type(o)? == ElemType::Message {
            let addr = self.read_str(o + 4)?.to_owned();
            return self.push_string(b, &addr);
        }
        let mut children = Vec::new();
        let mut child = o + 4 + BUNDLE_HEADER_LEN;
        while child < o + 4 + s {
            let cs = self.elem_size(child)?;
            children.push(child);
            child += cs + 4;
        }
        let mut payload = 0;
        for &c in &children {
            payload += self.padded_str_len(c + 4)?;
        }
        let content = ANON_ADDRESS_SIZE + padded_len(1 + children.len()) + payload;
        self.ensure_space(b, content + 4)?;

        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, content as i32)?;
        w.put_padded_str(self, ANON_ADDRESS)?;
        w.put_u8(self, TYPETAG_ID)?;
        for _ in &children {
            w.put_u8(self, TypeTag::String.to_byte())?;
        }
        w.terminate_pad(self)?;
        for &c in &children {
            let width = self.padded_str_len(c + 4)?;
            w.put_copy(self, c + 4..c + 4 + width)?;
        }
        let len = w.len();
        // commit over nothing: the scratch simply becomes the new top
        let from = self.end_of(b)?;
        self.commit_scratch(b, from, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stackops::Item;

    fn stack() -> (Arena, Bundle) {
        let a = Arena::with_capacity(4096).unwrap();
        let b = a.working().unwrap();
        (a, b)
    }

    #[test]
    fn counts() {
        let (mut a, b) = stack();
        a.push_i32(b, 1).unwrap();
        a.push_message(b, "/m", &[Item::I32(1), Item::Str("x")]).unwrap();
        a.count_elems(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 2);
        a.count_items(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 2);
        a.bundle_all(b).unwrap();
        a.count_items(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 2);
    }

    #[test]
    fn sizes_and_lengths() {
        let (mut a, b) = stack();
        a.push_message(b, "/m", &[Item::Str("abcdef")]).unwrap();
        a.size_elem(b).unwrap();
        // 4 addr + 4 tt + 8 string
        assert_eq!(a.pop_i32(b).unwrap(), 16);
        a.size_item(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 8);
        a.length_item(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 6);
        a.size_tt(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 4);
    }

    #[test]
    fn addresses_of_a_bundle() {
        let (mut a, b) = stack();
        a.push_message(b, "/one", &[]).unwrap();
        a.push_message(b, "/two", &[Item::I32(2)]).unwrap();
        a.push_i32(b, 2).unwrap();
        a.bundle_from_top(b).unwrap();
        a.get_addresses(b).unwrap();
        let o = a.last_elem_offset(b).unwrap();
        assert_eq!(a.elem_item_count(o).unwrap(), 2);
        let loc = a.nth_item_from_end(o, 2).unwrap();
        assert_eq!(a.read_str(loc.item_off).unwrap(), "/one");
        let loc = a.nth_item_from_end(o, 1).unwrap();
        assert_eq!(a.read_str(loc.item_off).unwrap(), "/two");
    }

    #[test]
    fn address_of_a_message() {
        let (mut a, b) = stack();
        a.push_message(b, "/solo", &[]).unwrap();
        a.get_addresses(b).unwrap();
        assert_eq!(a.peek_str(b).unwrap(), "/solo");
    }
}
