//! Grouping and ungrouping
//!
//! These primitives move the boundary between "element of the stack" and
//! "content of an element": wrapping elements into nested bundles,
//! merging and splitting messages, and exploding containers back into
//! elements.

use crate::arena::{Arena, Bundle, ElemType};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::stackops::Composer;
use crate::tag::TYPETAG_ID;

impl Arena {
    /// Wrap every element of `b` into one nested bundle.
    pub fn bundle_all(&mut self, b: Bundle) -> Result<(), VmError> {
        let size = self.bundle_size(b)?;
        self.grow(b, 4 + BUNDLE_HEADER_LEN)?;
        self.copy_within(b.0 + BUNDLE_HEADER_LEN..b.0 + size, b.0 + BUNDLE_HEADER_LEN + 20);
        self.write_i32(b.0 + BUNDLE_HEADER_LEN, size as i32)?;
        self.splice_bytes(b.0 + BUNDLE_HEADER_LEN + 4, BUNDLE_ID)?;
        self.fill(b.0 + BUNDLE_HEADER_LEN + 4 + BUNDLE_ID_LEN, b.0 + BUNDLE_HEADER_LEN + 20, 0);
        Ok(())
    }

    /// Consume an int32 `n` and wrap the top `n` elements into a nested
    /// bundle.
    pub fn bundle_from_top(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        let count = self.elem_count(b)?;
        if (n as usize) > count {
            return Err(Status::ElemCount.into());
        }
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        for _ in 0..count - n as usize {
            offset += self.elem_size(offset)? + 4;
        }
        let end = self.end_of(b)?;
        let wrapped = end - offset;
        self.grow(b, 4 + BUNDLE_HEADER_LEN)?;
        self.copy_within(offset..end, offset + 20);
        self.write_i32(offset, (wrapped + BUNDLE_HEADER_LEN) as i32)?;
        self.splice_bytes(offset + 4, BUNDLE_ID)?;
        self.fill(offset + 4 + BUNDLE_ID_LEN, offset + 20, 0);
        Ok(())
    }

    /// Consume an int32 `n` and wrap the bottom `n` elements into a
    /// nested bundle.
    pub fn bundle_from_bottom(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        self.require_elems(b, n as usize)?;
        let mut wrapped = 0;
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        for _ in 0..n {
            let s = self.elem_size(offset)? + 4;
            offset += s;
            wrapped += s;
        }
        let size = self.bundle_size(b)?;
        self.grow(b, 4 + BUNDLE_HEADER_LEN)?;
        self.copy_within(b.0 + BUNDLE_HEADER_LEN..b.0 + size, b.0 + BUNDLE_HEADER_LEN + 20);
        self.write_i32(b.0 + BUNDLE_HEADER_LEN, (wrapped + BUNDLE_HEADER_LEN) as i32)?;
        self.splice_bytes(b.0 + BUNDLE_HEADER_LEN + 4, BUNDLE_ID)?;
        self.fill(b.0 + BUNDLE_HEADER_LEN + 4 + BUNDLE_ID_LEN, b.0 + BUNDLE_HEADER_LEN + 20, 0);
        Ok(())
    }

    /// Remove every element, keeping the header.
    pub fn clear_elems(&mut self, b: Bundle) -> Result<(), VmError> {
        let size = self.bundle_size(b)?;
        self.shrink(b, size - BUNDLE_HEADER_LEN)
    }

    /// Merge two nested bundles by splicing the top one's elements into
    /// the one below; any other pair behaves like [`Arena::push`].
    pub fn join(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        if self.elem_type(o1)? == ElemType::Bundle && self.elem_type(o2)? == ElemType::Bundle {
            self.copy_within(o2 + 4 + BUNDLE_HEADER_LEN..o2 + 4 + s2, o2);
            self.write_i32(o1, (s1 + s2 - BUNDLE_HEADER_LEN) as i32)?;
            self.shrink(b, 4 + BUNDLE_HEADER_LEN)
        } else {
            self.push(b)
        }
    }

    /// Merge the two topmost elements.
    ///
    /// With a bundle below, the top element is absorbed as its last
    /// child. With two messages, the lower message keeps its address and
    /// gains the upper one's items. A bundle on top of a message becomes
    /// a blob item of the message. On an empty stack an empty bundle is
    /// pushed; a single element is wrapped.
    pub fn push(&mut self, b: Bundle) -> Result<(), VmError> {
        let count = self.elem_count(b)?;
        if count == 0 {
            return self.push_bundle(b);
        }
        if count == 1 {
            self.push_i32(b, 1)?;
            return self.bundle_from_top(b);
        }
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        match (self.elem_type(o1)?, self.elem_type(o2)?) {
            (ElemType::Bundle, _) => {
                // absorb the top element as the bundle's last child
                self.write_i32(o1, (s1 + s2 + 4) as i32)
            }
            (ElemType::Message, ElemType::Bundle) => self.push_bundle_into_message(b, o1, s1, s2),
            (ElemType::Message, ElemType::Message) => self.push_concat_messages(b, o1, s1, o2, s2),
            _ => Err(Status::ElemType.into()),
        }
    }

    fn push_bundle_into_message(
        &mut self,
        b: Bundle,
        o1: usize,
        s1: usize,
        s2: usize,
    ) -> Result<(), VmError> {
        let tt_start = o1 + 4 + self.padded_str_len(o1 + 4)?;
        let ntt = self.str_len(tt_start)?;
        if padded_len(ntt) != padded_len(ntt + 1) {
            // the typetag string needs another word; shift everything
            // after it up by 4
            let payload = tt_start + padded_len(ntt);
            let end = self.end_of(b)?;
            self.grow(b, 4)?;
            self.copy_within(payload..end, payload + 4);
            self.fill(payload, payload + 4, 0);
            self.write_i32(o1, (s1 + 4) as i32)?;
        }
        self.write_u8(tt_start + ntt, crate::tag::TypeTag::Blob.to_byte())?;
        // the bundle's size field doubles as the blob length prefix
        let s1 = self.elem_size(o1)?;
        self.write_i32(o1, (s1 + s2 + 4) as i32)
    }

    fn push_concat_messages(
        &mut self,
        b: Bundle,
        o1: usize,
        s1: usize,
        o2: usize,
        s2: usize,
    ) -> Result<(), VmError> {
        let addr_width = self.padded_str_len(o1 + 4)?;
        let tt1 = o1 + 4 + addr_width;
        let ntt1 = self.str_len(tt1)?;
        let payload1 = tt1 + padded_len(ntt1);
        let payload1_len = s1 - (payload1 - (o1 + 4));
        let tt2 = o2 + 4 + self.padded_str_len(o2 + 4)?;
        let ntt2 = self.str_len(tt2)?;
        let payload2 = tt2 + padded_len(ntt2);
        let payload2_len = s2 - (payload2 - (o2 + 4));

        let new_ntt = ntt1 + ntt2 - 1;
        let new_size = addr_width + padded_len(new_ntt) + payload1_len + payload2_len;
        self.ensure_space(b, new_size + 4)?;

        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        w.put_copy(self, o1 + 4..o1 + 4 + addr_width)?;
        w.put_copy(self, tt1..tt1 + ntt1)?;
        w.put_copy(self, tt2 + 1..tt2 + ntt2)?;
        w.terminate_pad(self)?;
        w.put_copy(self, payload1..payload1 + payload1_len)?;
        w.put_copy(self, payload2..payload2 + payload2_len)?;
        let len = w.len();
        self.commit_scratch(b, o1, len)
    }

    /// Detach the rightmost item of the top element.
    ///
    /// From a message the item becomes a new anonymous message above it;
    /// a message with no items is replaced by a string message carrying
    /// its address. From a bundle the last child is detached; an empty
    /// bundle is removed.
    pub fn pop(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        match self.elem_type(o)? {
            ElemType::Bundle => {
                if s <= BUNDLE_HEADER_LEN {
                    return self.shrink(b, 4 + BUNDLE_HEADER_LEN);
                }
                let mut child = o + 4 + BUNDLE_HEADER_LEN;
                let mut cs = self.elem_size(child)?;
                while child + cs + 4 < o + 4 + s {
                    child += cs + 4;
                    cs = self.elem_size(child)?;
                }
                self.write_i32(o, (s - (cs + 4)) as i32)
            }
            ElemType::Message => match self.nth_item_from_end(o, 1) {
                Err(VmError::Status(Status::ItemCount)) => {
                    let addr = self.read_str(o + 4)?.to_owned();
                    self.push_string(b, &addr)?;
                    self.swap(b)?;
                    self.drop_elem(b)
                }
                Err(e) => Err(e),
                Ok(loc) => {
                    let tag = self.read_u8(loc.tt_off)?;
                    let item_width = o + 4 + s - loc.item_off;
                    let msg1_size = loc.item_off - (o + 4) - if padded_len(loc.ntt) != padded_len(loc.ntt - 1) { 4 } else { 0 };
                    let msg2_size = ANON_ADDRESS_SIZE + 4 + item_width;
                    self.ensure_space(b, msg1_size + msg2_size + 8)?;

                    let scratch = self.end_of(b)?;
                    let mut w = Composer::at(scratch);
                    // remainder of the original message
                    w.put_i32(self, msg1_size as i32)?;
                    let addr_width = self.padded_str_len(o + 4)?;
                    w.put_copy(self, o + 4..o + 4 + addr_width)?;
                    w.put_copy(self, loc.tt_start..loc.tt_off)?;
                    w.terminate_pad(self)?;
                    w.put_copy(self, loc.payload_start..loc.item_off)?;
                    // the detached item
                    w.put_i32(self, msg2_size as i32)?;
                    w.put_padded_str(self, ANON_ADDRESS)?;
                    w.put_u8(self, TYPETAG_ID)?;
                    w.put_u8(self, tag)?;
                    w.terminate_pad(self)?;
                    w.put_copy(self, loc.item_off..loc.item_off + item_width)?;
                    let len = w.len();
                    self.commit_scratch(b, o, len)
                }
            },
        }
    }

    /// Pop every item of the top element, leaving the items reversed
    /// under the emptied container.
    pub fn pop_all(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        match self.elem_type(o)? {
            ElemType::Bundle => {
                let mut children = Vec::new();
                let mut child = o + 4 + BUNDLE_HEADER_LEN;
                while child < o + 4 + s {
                    let cs = self.elem_size(child)?;
                    children.push((child, cs));
                    child += cs + 4;
                }
                self.ensure_space(b, s + 4)?;
                let scratch = self.end_of(b)?;
                let mut w = Composer::at(scratch);
                for &(co, cs) in children.iter().rev() {
                    w.put_copy(self, co..co + cs + 4)?;
                }
                w.put_i32(self, BUNDLE_HEADER_LEN as i32)?;
                w.put_bytes(self, BUNDLE_ID)?;
                w.pad_to_word(self)?;
                w.put_bytes(self, &[0u8; 8])?;
                let len = w.len();
                self.commit_scratch(b, o, len)
            }
            ElemType::Message => {
                let tt_start = o + 4 + self.padded_str_len(o + 4)?;
                let ntt = self.str_len(tt_start)?;
                let mut items = Vec::new();
                let mut item = tt_start + padded_len(ntt);
                for i in 1..ntt {
                    let tag = self.read_u8(tt_start + i)?;
                    let width = self.typed_size(tag, item)?;
                    items.push((tag, item, width));
                    item += width;
                }
                let addr = self.read_str(o + 4)?.to_owned();
                let need: usize = items
                    .iter()
                    .map(|&(_, _, w)| ANON_ADDRESS_SIZE + 12 + w)
                    .sum::<usize>()
                    + 4
                    + padded_len(addr.len())
                    + EMPTY_TYPETAG_STRING_SIZE;
                self.ensure_space(b, need)?;
                let scratch = self.end_of(b)?;
                let mut w = Composer::at(scratch);
                for &(tag, off, width) in items.iter().rev() {
                    w.put_i32(self, (ANON_ADDRESS_SIZE + 4 + width) as i32)?;
                    w.put_padded_str(self, ANON_ADDRESS)?;
                    w.put_u8(self, TYPETAG_ID)?;
                    w.put_u8(self, tag)?;
                    w.terminate_pad(self)?;
                    w.put_copy(self, off..off + width)?;
                }
                w.put_i32(self, (padded_len(addr.len()) + EMPTY_TYPETAG_STRING_SIZE) as i32)?;
                w.put_padded_str(self, &addr)?;
                w.put_u8(self, TYPETAG_ID)?;
                w.terminate_pad(self)?;
                let len = w.len();
                self.commit_scratch(b, o, len)
            }
        }
    }

    /// [`Arena::pop_all`] followed by dropping the emptied container.
    pub fn pop_all_drop(&mut self, b: Bundle) -> Result<(), VmError> {
        self.pop_all(b)?;
        self.drop_elem(b)
    }

    /// Pop every item of the top element into a fresh bundle, container
    /// included.
    pub fn pop_all_bundle(&mut self, b: Bundle) -> Result<(), VmError> {
        self.push_bundle(b)?;
        self.swap(b)?;
        let [(o1, _), _] = self.top_elems::<2>(b)?;
        self.pop_all(b)?;
        let end = self.end_of(b)?;
        self.write_i32(o1, (end - o1 - 4) as i32)
    }

    /// Pop every item of the top element into a fresh bundle, dropping
    /// the emptied container.
    pub fn pop_all_drop_bundle(&mut self, b: Bundle) -> Result<(), VmError> {
        self.push_bundle(b)?;
        self.swap(b)?;
        let [(o1, _), _] = self.top_elems::<2>(b)?;
        self.pop_all_drop(b)?;
        let end = self.end_of(b)?;
        self.write_i32(o1, (end - o1 - 4) as i32)
    }

    /// Consume an int32 `n` and partition the top element at item `n`:
    /// the first `n` items (or children) stay, the rest move to a new
    /// element above.
    pub fn split(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        let n = n as usize;
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        match self.elem_type(o)? {
            ElemType::Bundle => {
                let mut offset = o + 4 + BUNDLE_HEADER_LEN;
                let mut kept = 0;
                while kept < n && offset < o + 4 + s {
                    offset += self.elem_size(offset)? + 4;
                    kept += 1;
                }
                let rest = o + 4 + s - offset;
                let end = self.end_of(b)?;
                self.grow(b, 4 + BUNDLE_HEADER_LEN)?;
                self.copy_within(offset..end, offset + 20);
                self.write_i32(o, (s - rest) as i32)?;
                self.write_i32(offset, (rest + BUNDLE_HEADER_LEN) as i32)?;
                self.splice_bytes(offset + 4, BUNDLE_ID)?;
                self.fill(offset + 4 + BUNDLE_ID_LEN, offset + 20, 0);
                Ok(())
            }
            ElemType::Message => {
                let tt_start = o + 4 + self.padded_str_len(o + 4)?;
                let ntt = self.str_len(tt_start)?;
                let items = ntt - 1;
                let kept = n.min(items);
                let mut split_at = tt_start + padded_len(ntt);
                for i in 0..kept {
                    let tag = self.read_u8(tt_start + 1 + i)?;
                    split_at += self.typed_size(tag, split_at)?;
                }
                let rest_items = items - kept;
                let rest_payload = o + 4 + s - split_at;
                let addr_width = self.padded_str_len(o + 4)?;

                let msg1_size = addr_width + padded_len(1 + kept)
                    + (split_at - (tt_start + padded_len(ntt)));
                let msg2_size = ANON_ADDRESS_SIZE + padded_len(1 + rest_items) + rest_payload;
                self.ensure_space(b, msg1_size + msg2_size + 8)?;

                let scratch = self.end_of(b)?;
                let mut w = Composer::at(scratch);
                w.put_i32(self, msg1_size as i32)?;
                w.put_copy(self, o + 4..o + 4 + addr_width)?;
                w.put_copy(self, tt_start..tt_start + 1 + kept)?;
                w.terminate_pad(self)?;
                w.put_copy(self, tt_start + padded_len(ntt)..split_at)?;
                w.put_i32(self, msg2_size as i32)?;
                w.put_padded_str(self, ANON_ADDRESS)?;
                w.put_u8(self, TYPETAG_ID)?;
                w.put_copy(self, tt_start + 1 + kept..tt_start + ntt)?;
                w.terminate_pad(self)?;
                w.put_copy(self, split_at..split_at + rest_payload)?;
                let len = w.len();
                self.commit_scratch(b, o, len)
            }
        }
    }

    /// Explode the top element into its constituents, preserving order.
    ///
    /// A bundle's children become elements in place; a message becomes
    /// its address message followed by one anonymous message per item.
    pub fn unpack(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        match self.elem_type(o)? {
            ElemType::Bundle => self.write_i32(o, BUNDLE_HEADER_LEN as i32),
            ElemType::Message => {
                let tt_start = o + 4 + self.padded_str_len(o + 4)?;
                let ntt = self.str_len(tt_start)?;
                let mut items = Vec::new();
                let mut item = tt_start + padded_len(ntt);
                for i in 1..ntt {
                    let tag = self.read_u8(tt_start + i)?;
                    let width = self.typed_size(tag, item)?;
                    items.push((tag, item, width));
                    item += width;
                }
                let addr = self.read_str(o + 4)?.to_owned();
                let need: usize = items
                    .iter()
                    .map(|&(_, _, w)| ANON_ADDRESS_SIZE + 12 + w)
                    .sum::<usize>()
                    + 4
                    + padded_len(addr.len())
                    + EMPTY_TYPETAG_STRING_SIZE;
                self.ensure_space(b, need)?;
                let scratch = self.end_of(b)?;
                let mut w = Composer::at(scratch);
                w.put_i32(self, (padded_len(addr.len()) + EMPTY_TYPETAG_STRING_SIZE) as i32)?;
                w.put_padded_str(self, &addr)?;
                w.put_u8(self, TYPETAG_ID)?;
                w.terminate_pad(self)?;
                for &(tag, off, width) in &items {
                    w.put_i32(self, (ANON_ADDRESS_SIZE + 4 + width) as i32)?;
                    w.put_padded_str(self, ANON_ADDRESS)?;
                    w.put_u8(self, TYPETAG_ID)?;
                    w.put_u8(self, tag)?;
                    w.terminate_pad(self)?;
                    w.put_copy(self, off..off + width)?;
                }
                let len = w.len();
                self.commit_scratch(b, o, len)
            }
        }
    }

    /// [`Arena::unpack`], dropping the emptied container.
    pub fn unpack_drop(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let n = self.elem_item_count(o)?;
        self.unpack(b)?;
        self.push_i32(b, n as i32)?;
        self.roll(b)?;
        self.drop_elem(b)
    }
}
