//! Payload item manipulation
//!
//! Reinterpretations between blobs, elements and scalars, address/string
//! conversions, and byte-level string and blob surgery with repadding.

use crate::arena::{Arena, Bundle, ElemType};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::stackops::Composer;
use crate::tag::{TypeTag, TYPETAG_ID};

impl Arena {
    /// Reinterpret the top blob as a bundle element, discarding the
    /// carrier message. The blob's length prefix becomes the element's
    /// size field, so the content may be either an encoded message or a
    /// nested bundle.
    pub fn blob_to_elem(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, Some(TypeTag::Blob))?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        let width = self.padded_blob_size(loc.item_off)?;
        self.write_u8(loc.tt_off, 0)?;
        self.write_i32(o, (s - width) as i32)?;
        // the blob's length prefix becomes the element's size field
        self.write_i32(loc.item_off, (width - 4) as i32)?;
        self.nip(b)
    }

    /// Consume an int32 tag and reinterpret the top blob as a scalar of
    /// that type, dropping the length prefix.
    pub fn blob_to_type(&mut self, b: Bundle) -> Result<(), VmError> {
        let tag = self.pop_i32(b)?;
        let tag = TypeTag::from_byte(tag as u8)?;
        let loc = self.top_item(b, Some(TypeTag::Blob))?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        let end = self.end_of(b)?;
        self.write_u8(loc.tt_off, tag.to_byte())?;
        self.copy_within(loc.item_off + 4..end, loc.item_off);
        self.write_i32(o, (s - 4) as i32)?;
        self.shrink(b, 4)
    }

    /// Wrap the top element, whatever it is, into an anonymous message
    /// holding it as a blob.
    pub fn elem_to_blob(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        let end = self.end_of(b)?;
        self.grow(b, 12)?;
        self.copy_within(o..end, o + 12);
        self.write_i32(o, (s + 12) as i32)?;
        self.write_padded_str(o + 4, ANON_ADDRESS)?;
        self.write_u8(o + 8, TYPETAG_ID)?;
        self.write_u8(o + 9, TypeTag::Blob.to_byte())?;
        self.write_u8(o + 10, 0)?;
        self.write_u8(o + 11, 0)?;
        Ok(())
    }

    /// Turn the rightmost payload item of the top message into a blob of
    /// its encoded bytes.
    pub fn item_to_blob(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, None)?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        let width = o + 4 + s - loc.item_off;
        let end = self.end_of(b)?;
        self.grow(b, 4)?;
        self.copy_within(loc.item_off..end, loc.item_off + 4);
        self.write_i32(loc.item_off, width as i32)?;
        self.write_u8(loc.tt_off, TypeTag::Blob.to_byte())?;
        self.write_i32(o, (s + 4) as i32)
    }

    /// Push the top message's address as a string.
    pub fn copy_address_to_string(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        if self.elem_type(o)? == ElemType::Bundle {
            return Err(Status::ElemType.into());
        }
        let addr = self.read_str(o + 4)?.to_owned();
        self.push_string(b, &addr)
    }

    /// Promote the rightmost string item of the top message to its
    /// address, consuming the item.
    pub fn move_string_to_address(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, Some(TypeTag::String))?;
        let o = self.last_elem_offset(b)?;
        let new_addr = self.read_str(loc.item_off)?.to_owned();
        let new_size = padded_len(new_addr.len())
            + padded_len(loc.ntt - 1)
            + (loc.item_off - loc.payload_start);
        self.ensure_space(b, new_size + 4)?;

        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        w.put_padded_str(self, &new_addr)?;
        w.put_copy(self, loc.tt_start..loc.tt_off)?;
        w.terminate_pad(self)?;
        w.put_copy(self, loc.payload_start..loc.item_off)?;
        let len = w.len();
        self.commit_scratch(b, o, len)
    }

    /// Exchange the top message's address with its rightmost string
    /// item.
    pub fn swap_string_to_address(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, Some(TypeTag::String))?;
        let o = self.last_elem_offset(b)?;
        let old_addr = self.read_str(o + 4)?.to_owned();
        let new_addr = self.read_str(loc.item_off)?.to_owned();
        let new_size = padded_len(new_addr.len())
            + padded_len(loc.ntt)
            + (loc.item_off - loc.payload_start)
            + padded_len(old_addr.len());
        self.ensure_space(b, new_size + 4)?;

        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        w.put_padded_str(self, &new_addr)?;
        w.put_copy(self, loc.tt_start..loc.tt_start + loc.ntt)?;
        w.terminate_pad(self)?;
        w.put_copy(self, loc.payload_start..loc.item_off)?;
        w.put_padded_str(self, &old_addr)?;
        let len = w.len();
        self.commit_scratch(b, o, len)
    }

    /// Join the two rightmost string items of the top message into one.
    pub fn concatenate_strings(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc2 = self.top_item_n(b, 2)?;
        let loc1 = self.top_item_n(b, 1)?;
        let t2 = TypeTag::from_byte(self.read_u8(loc2.tt_off)?)?;
        let t1 = TypeTag::from_byte(self.read_u8(loc1.tt_off)?)?;
        if !t2.is_string() || !t1.is_string() {
            return Err(Status::ItemType.into());
        }
        let o = self.last_elem_offset(b)?;
        let first = self.read_str(loc2.item_off)?.to_owned();
        let second = self.read_str(loc1.item_off)?.to_owned();
        let combined = format!("{first}{second}");

        let new_size = (loc2.item_off - (o + 4))
            + padded_len(combined.len())
            - if padded_len(loc2.ntt) != padded_len(loc2.ntt - 1) { 4 } else { 0 };
        self.ensure_space(b, new_size + 4)?;

        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        let addr_width = self.padded_str_len(o + 4)?;
        w.put_copy(self, o + 4..o + 4 + addr_width)?;
        w.put_copy(self, loc2.tt_start..loc2.tt_off + 1)?;
        w.terminate_pad(self)?;
        w.put_copy(self, loc2.payload_start..loc2.item_off)?;
        w.put_padded_str(self, &combined)?;
        let len = w.len();
        self.commit_scratch(b, o, len)
    }

    /// Join the two rightmost blob items of the top message into one.
    pub fn concatenate_blobs(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc2 = self.top_item_n(b, 2)?;
        let loc1 = self.top_item_n(b, 1)?;
        if self.read_u8(loc2.tt_off)? != TypeTag::Blob.to_byte()
            || self.read_u8(loc1.tt_off)? != TypeTag::Blob.to_byte()
        {
            return Err(Status::ItemType.into());
        }
        let o = self.last_elem_offset(b)?;
        let first = self.read_blob(loc2.item_off)?.to_vec();
        let second = self.read_blob(loc1.item_off)?.to_vec();
        let combined: Vec<u8> = first.into_iter().chain(second).collect();

        let width = 4 + combined.len() + blob_padding(combined.len());
        let new_size = (loc2.item_off - (o + 4)) + width
            - if padded_len(loc2.ntt) != padded_len(loc2.ntt - 1) { 4 } else { 0 };
        self.ensure_space(b, new_size + 4)?;

        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        let addr_width = self.padded_str_len(o + 4)?;
        w.put_copy(self, o + 4..o + 4 + addr_width)?;
        w.put_copy(self, loc2.tt_start..loc2.tt_off + 1)?;
        w.terminate_pad(self)?;
        w.put_copy(self, loc2.payload_start..loc2.item_off)?;
        w.put_i32(self, combined.len() as i32)?;
        w.put_bytes(self, &combined)?;
        w.pad_to_word(self)?;
        let len = w.len();
        self.commit_scratch(b, o, len)
    }

    fn decatenate_string_impl(&mut self, b: Bundle, n: usize) -> Result<(), VmError> {
        let loc = self.top_item(b, Some(TypeTag::String))?;
        let o = self.last_elem_offset(b)?;
        let s = self.read_str(loc.item_off)?.to_owned();
        if n > s.len() {
            return Err(Status::Range.into());
        }
        let (head, tail) = s.split_at(s.len() - n);
        let new_size = (loc.item_off - (o + 4))
            + padded_len(head.len())
            + padded_len(tail.len())
            + if padded_len(loc.ntt) != padded_len(loc.ntt + 1) { 4 } else { 0 };
        self.ensure_space(b, new_size + 4)?;

        let head = head.to_owned();
        let tail = tail.to_owned();
        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        let addr_width = self.padded_str_len(o + 4)?;
        w.put_copy(self, o + 4..o + 4 + addr_width)?;
        w.put_copy(self, loc.tt_start..loc.tt_off + 1)?;
        w.put_u8(self, TypeTag::String.to_byte())?;
        w.terminate_pad(self)?;
        w.put_copy(self, loc.payload_start..loc.item_off)?;
        w.put_padded_str(self, &head)?;
        w.put_padded_str(self, &tail)?;
        let len = w.len();
        self.commit_scratch(b, o, len)
    }

    /// Consume an int32 `n` and split the rightmost string item into two
    /// items, the second holding the last `n` characters.
    pub fn decatenate_string_from_end(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        self.decatenate_string_impl(b, n as usize)
    }

    /// Consume an int32 `n` and split the rightmost string item into two
    /// items, the first holding the first `n` characters.
    pub fn decatenate_string_from_start(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        let len = self.peek_str(b)?.len();
        if (n as usize) > len {
            return Err(Status::Range.into());
        }
        self.decatenate_string_impl(b, len - n as usize)
    }

    fn decatenate_blob_impl(&mut self, b: Bundle, n: usize) -> Result<(), VmError> {
        let loc = self.top_item(b, Some(TypeTag::Blob))?;
        let o = self.last_elem_offset(b)?;
        let payload = self.read_blob(loc.item_off)?.to_vec();
        if n > payload.len() {
            return Err(Status::Range.into());
        }
        let (head, tail) = payload.split_at(payload.len() - n);
        let head = head.to_vec();
        let tail = tail.to_vec();
        let head_width = 4 + head.len() + blob_padding(head.len());
        let tail_width = 4 + tail.len() + blob_padding(tail.len());
        let new_size = (loc.item_off - (o + 4))
            + head_width
            + tail_width
            + if padded_len(loc.ntt) != padded_len(loc.ntt + 1) { 4 } else { 0 };
        self.ensure_space(b, new_size + 4)?;

        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        let addr_width = self.padded_str_len(o + 4)?;
        w.put_copy(self, o + 4..o + 4 + addr_width)?;
        w.put_copy(self, loc.tt_start..loc.tt_off + 1)?;
        w.put_u8(self, TypeTag::Blob.to_byte())?;
        w.terminate_pad(self)?;
        w.put_copy(self, loc.payload_start..loc.item_off)?;
        w.put_i32(self, head.len() as i32)?;
        w.put_bytes(self, &head)?;
        w.pad_to_word(self)?;
        w.put_i32(self, tail.len() as i32)?;
        w.put_bytes(self, &tail)?;
        w.pad_to_word(self)?;
        let len = w.len();
        self.commit_scratch(b, o, len)
    }

    /// Consume an int32 `n` and split the rightmost blob item into two
    /// blobs, the second holding the last `n` bytes.
    pub fn decatenate_blob_from_end(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        self.decatenate_blob_impl(b, n as usize)
    }

    /// Consume an int32 `n` and split the rightmost blob item into two
    /// blobs, the first holding the first `n` bytes.
    pub fn decatenate_blob_from_start(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        let len = self.peek_blob(b)?.len();
        if (n as usize) > len {
            return Err(Status::Range.into());
        }
        self.decatenate_blob_impl(b, len - n as usize)
    }

    /// Split the string below at the last occurrence of the separator on
    /// top. Leaves the stack untouched when the separator is absent.
    pub fn split_string_from_end(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o2, _), _] = self.top_elems::<2>(b)?;
        let sep = self.peek_str(b)?.to_owned();
        let loc = self.nth_item_from_end(o2, 1)?;
        let s = self.read_str(loc.item_off)?.to_owned();
        let Some(idx) = s.rfind(&sep) else {
            return Ok(());
        };
        let n = idx.max(1);
        self.over(b)?;
        self.push_i32(b, (s.len() - n) as i32)?;
        self.decatenate_string_from_end(b)?;
        self.rot(b)?;
        self.drop_elem(b)?;
        self.pop(b)?;
        self.swap(b)?;
        self.rot(b)
    }

    /// Split the string below at the first occurrence of the separator
    /// on top. Leaves the stack untouched when the separator is absent.
    pub fn split_string_from_start(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o2, _), _] = self.top_elems::<2>(b)?;
        let sep = self.peek_str(b)?.to_owned();
        let loc = self.nth_item_from_end(o2, 1)?;
        let s = self.read_str(loc.item_off)?.to_owned();
        let Some(idx) = s.find(&sep) else {
            return Ok(());
        };
        let n = if idx == 0 {
            match s[1..].find(&sep) {
                Some(next) => next + 1,
                None => 1,
            }
        } else {
            idx
        };
        self.over(b)?;
        self.push_i32(b, (s.len() - n) as i32)?;
        self.decatenate_string_from_end(b)?;
        self.rot(b)?;
        self.drop_elem(b)?;
        self.pop(b)?;
        self.rot(b)
    }

    fn trim_range(c: u8) -> bool {
        c <= 32 || c >= 127
    }

    /// Strip unprintable characters from the end of the rightmost string
    /// item.
    pub fn trim_string_end(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, Some(TypeTag::String))?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        let len = self.str_len(loc.item_off)?;
        let mut kept = len;
        while kept > 0 && Self::trim_range(self.read_u8(loc.item_off + kept - 1)?) {
            kept -= 1;
        }
        self.fill(loc.item_off + kept, loc.item_off + len, 0);
        let delta = padded_len(len) - padded_len(kept);
        if delta > 0 {
            self.write_i32(o, (s - delta) as i32)?;
            self.shrink(b, delta)?;
        }
        Ok(())
    }

    /// Strip unprintable characters from the start of the rightmost
    /// string item.
    pub fn trim_string_start(&mut self, b: Bundle) -> Result<(), VmError> {
        let loc = self.top_item(b, Some(TypeTag::String))?;
        let o = self.last_elem_offset(b)?;
        let s = self.elem_size(o)?;
        let len = self.str_len(loc.item_off)?;
        let mut cut = 0;
        while cut < len && Self::trim_range(self.read_u8(loc.item_off + cut)?) {
            cut += 1;
        }
        if cut == 0 {
            return Ok(());
        }
        self.copy_within(loc.item_off + cut..loc.item_off + len, loc.item_off);
        self.fill(loc.item_off + len - cut, loc.item_off + padded_len(len), 0);
        let delta = padded_len(len) - padded_len(len - cut);
        if delta > 0 {
            self.write_i32(o, (s - delta) as i32)?;
            self.shrink(b, delta)?;
        }
        Ok(())
    }

    /// Join the two strings below the separator on top:
    /// `[s1, s2, sep]` becomes one message holding `s1 sep s2`.
    pub fn join_strings(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 3)?;
        self.swap(b)?;
        self.push(b)?;
        self.push(b)?;
        self.concatenate_strings(b)?;
        self.concatenate_strings(b)
    }

    fn reverse_tail(&mut self, b: Bundle, n: usize) -> Result<(), VmError> {
        let end = self.end_of(b)?;
        if n > self.bundle_size(b)? {
            return Err(Status::Range.into());
        }
        let (mut i, mut j) = (end - n, end - 1);
        while i < j {
            let x = self.read_u8(i)?;
            let y = self.read_u8(j)?;
            self.write_u8(i, y)?;
            self.write_u8(j, x)?;
            i += 1;
            j -= 1;
        }
        Ok(())
    }

    /// Reverse the last 4 content bytes, toggling the endianness of a
    /// 4-byte scalar at the top.
    pub fn swap_4_bytes(&mut self, b: Bundle) -> Result<(), VmError> {
        self.reverse_tail(b, 4)
    }

    /// Reverse the last 8 content bytes.
    pub fn swap_8_bytes(&mut self, b: Bundle) -> Result<(), VmError> {
        self.reverse_tail(b, 8)
    }

    /// Consume an int32 `n` and reverse the last `n` content bytes.
    pub fn swap_n_bytes(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        self.reverse_tail(b, n as usize)
    }

    /// Locate the `n`th payload item from the end of the top message.
    pub(crate) fn top_item_n(
        &self,
        b: Bundle,
        n: usize,
    ) -> Result<crate::arena::ItemLoc, VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        if self.elem_type(o)? == ElemType::Bundle {
            return Err(Status::ElemType.into());
        }
        self.nth_item_from_end(o, n)
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

    #[test]
    fn elem_to_blob_and_back() {
        let (mut a, b) = stack();
        a.push_i32(b, 42).unwrap();
        a.bundle_all(b).unwrap();
        let before = a.bytes(b.base()..a.end_of(b).unwrap()).to_vec();
        a.elem_to_blob(b).unwrap();
        assert_eq!(a.peek_item_tag(b).unwrap(), Some(TypeTag::Blob));
        a.blob_to_elem(b).unwrap();
        let after = a.bytes(b.base()..a.end_of(b).unwrap()).to_vec();
        assert_eq!(before, after);
    }

    #[test]
    fn blob_to_type_reinterprets_scalars() {
        let (mut a, b) = stack();
        a.push_blob(b, &1234i32.to_be_bytes()).unwrap();
        a.push_i32(b, TypeTag::Int32.to_byte() as i32).unwrap();
        a.blob_to_type(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 1234);
    }

    #[test]
    fn item_to_blob_wraps_the_encoding() {
        let (mut a, b) = stack();
        a.push_i32(b, 7).unwrap();
        a.item_to_blob(b).unwrap();
        assert_eq!(a.peek_blob(b).unwrap(), 7i32.to_be_bytes());
    }

    #[test]
    fn address_string_conversions() {
        let (mut a, b) = stack();
        a.push_message(b, "/orig", &[Item::I32(3), Item::Str("/next")])
            .unwrap();
        a.swap_string_to_address(b).unwrap();
        assert_eq!(a.peek_address(b).unwrap(), "/next");
        assert_eq!(a.peek_str(b).unwrap(), "/orig");
        a.move_string_to_address(b).unwrap();
        assert_eq!(a.peek_address(b).unwrap(), "/orig");
        let o = a.last_elem_offset(b).unwrap();
        assert_eq!(a.elem_item_count(o).unwrap(), 1);
        a.copy_address_to_string(b).unwrap();
        assert_eq!(a.pop_string(b).unwrap(), "/orig");
    }

    #[test]
    fn concat_and_decatenate_strings_round_trip() {
        let (mut a, b) = stack();
        a.push_message(b, "", &[Item::Str("abc"), Item::Str("defg")]).unwrap();
        a.concatenate_strings(b).unwrap();
        assert_eq!(a.peek_str(b).unwrap(), "abcdefg");
        a.push_i32(b, 4).unwrap();
        a.decatenate_string_from_end(b).unwrap();
        let o = a.last_elem_offset(b).unwrap();
        assert_eq!(a.elem_item_count(o).unwrap(), 2);
        let loc = a.nth_item_from_end(o, 2).unwrap();
        assert_eq!(a.read_str(loc.item_off).unwrap(), "abc");
        let loc = a.nth_item_from_end(o, 1).unwrap();
        assert_eq!(a.read_str(loc.item_off).unwrap(), "defg");
    }

    #[test]
    fn concat_and_decatenate_blobs() {
        let (mut a, b) = stack();
        a.push_message(b, "", &[Item::Blob(&[1, 2]), Item::Blob(&[3])]).unwrap();
        a.concatenate_blobs(b).unwrap();
        assert_eq!(a.peek_blob(b).unwrap(), &[1, 2, 3]);
        a.push_i32(b, 1).unwrap();
        a.decatenate_blob_from_start(b).unwrap();
        let o = a.last_elem_offset(b).unwrap();
        let loc = a.nth_item_from_end(o, 2).unwrap();
        assert_eq!(a.read_blob(loc.item_off).unwrap(), &[1]);
        let loc = a.nth_item_from_end(o, 1).unwrap();
        assert_eq!(a.read_blob(loc.item_off).unwrap(), &[2, 3]);
    }

    #[test]
    fn trims() {
        let (mut a, b) = stack();
        a.push_string(b, "  padded  ").unwrap();
        a.trim_string_end(b).unwrap();
        assert_eq!(a.peek_str(b).unwrap(), "  padded");
        a.trim_string_start(b).unwrap();
        assert_eq!(a.peek_str(b).unwrap(), "padded");
    }

    #[test]
    fn join_strings_inserts_the_separator() {
        let (mut a, b) = stack();
        a.push_string(b, "left").unwrap();
        a.push_string(b, "right").unwrap();
        a.push_string(b, "/").unwrap();
        a.join_strings(b).unwrap();
        assert_eq!(a.peek_str(b).unwrap(), "left/right");
        assert_eq!(a.elem_count(b).unwrap(), 1);
    }

    #[test]
    fn swap_bytes_toggles_endianness() {
        let (mut a, b) = stack();
        a.push_i32(b, 0x0102_0304).unwrap();
        a.swap_4_bytes(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 0x0403_0201);
    }

    #[test]
    fn split_string_from_start_and_end() {
        let (mut a, b) = stack();
        a.push_string(b, "/a/b/c").unwrap();
        a.push_string(b, "/").unwrap();
        a.split_string_from_end(b).unwrap();
        // suffix below, prefix above, separator on top
        assert_eq!(a.pop_string(b).unwrap(), "/");
        assert_eq!(a.pop_string(b).unwrap(), "/a/b");
        assert_eq!(a.pop_string(b).unwrap(), "/c");

        a.push_string(b, "a;b").unwrap();
        a.push_string(b, ";").unwrap();
        a.split_string_from_start(b).unwrap();
        assert_eq!(a.pop_string(b).unwrap(), ";");
        assert_eq!(a.pop_string(b).unwrap(), ";b");
        assert_eq!(a.pop_string(b).unwrap(), "a");

        a.push_string(b, "nosep").unwrap();
        a.push_string(b, "|").unwrap();
        a.split_string_from_end(b).unwrap();
        assert_eq!(a.pop_string(b).unwrap(), "|");
        assert_eq!(a.pop_string(b).unwrap(), "nosep");
    }
}
