//! Arena and wire-layer accessors
//!
//! The whole VM state is one contiguous, 4-byte-aligned byte buffer. A
//! [`Bundle`] is nothing but the offset of a `#bundle` header inside that
//! buffer; the bundle's size prefix lives in the four bytes before it.
//! All multi-byte values are big-endian on the wire regardless of host
//! endianness, converted at every read and write.

use crate::consts::*;
use crate::error::{Status, VmError};
use crate::tag::TypeTag;

/// Encoded width of an aligned pointer blob: pad-count word plus room to
/// slide a machine word to its natural alignment.
pub const ALIGNED_PTR_SIZE: usize = 2 * core::mem::size_of::<usize>();

/// Offset of the `/sx` status slot. The status context is always the first
/// element of the root bundle, so the slot's position is fixed by layout.
const STATUS_SLOT: usize = 4 + BUNDLE_HEADER_LEN + CONTEXT_BUNDLE_OFFSET - 16;

/// Handle to a bundle encoded inside an [`Arena`]: the byte offset of its
/// `#bundle` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bundle(pub(crate) usize);

impl Bundle {
    /// Offset of the `#bundle` header inside the arena.
    pub const fn base(self) -> usize {
        self.0
    }

    /// Offset of the size prefix.
    pub(crate) const fn size_field(self) -> usize {
        self.0 - 4
    }
}

/// Shape of a bundle element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemType {
    Message,
    Bundle,
}

/// Location of one payload item inside a message element, as produced by
/// [`Arena::nth_item_from_end`].
#[derive(Debug, Clone, Copy)]
pub struct ItemLoc {
    /// Offset of the typetag string (the leading comma).
    pub tt_start: usize,
    /// Length of the typetag string including the comma.
    pub ntt: usize,
    /// Offset of the selected item's tag byte.
    pub tt_off: usize,
    /// Offset of the first payload byte.
    pub payload_start: usize,
    /// Offset of the selected item's payload.
    pub item_off: usize,
}

/// The single contiguous byte buffer a VM instance owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena {
    buf: Vec<u8>,
}

impl Arena {
    /// Allocate a zeroed arena of `nbytes` (rounded down to a word
    /// boundary) and lay out the root bundle, the `/sx` status context and
    /// the `/cx` working context that will hold everything else.
    pub fn with_capacity(nbytes: usize) -> Result<Self, VmError> {
        let nbytes = nbytes & !3;
        if nbytes < MIN_ARENA_SIZE {
            return Err(VmError::ArenaTooSmall(nbytes));
        }
        let mut arena = Arena {
            buf: vec![0u8; nbytes],
        };
        arena.write_i32(0, BUNDLE_HEADER_LEN as i32)?;
        arena.buf[4..4 + BUNDLE_ID_LEN].copy_from_slice(BUNDLE_ID);
        let root = arena.root();
        arena.append_context(root, CONTEXT_MESSAGE_OVERHEAD + STATUS_CONTEXT_FREE, ADDR_STATUS)?;
        let rest = nbytes - 4 - BUNDLE_HEADER_LEN - (CONTEXT_MESSAGE_OVERHEAD + STATUS_CONTEXT_FREE);
        arena.append_context(root, rest, ADDR_WORKING)?;
        Ok(arena)
    }

    /// Reopen a snapshot taken with [`Arena::as_bytes`]. The buffer must
    /// begin with a root bundle.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self, VmError> {
        if buf.len() < MIN_ARENA_SIZE {
            return Err(VmError::ArenaTooSmall(buf.len()));
        }
        if &buf[4..4 + BUNDLE_ID_LEN] != BUNDLE_ID {
            return Err(VmError::NotABundle(4));
        }
        Ok(Arena { buf })
    }

    /// The raw state, suitable for byte-copy snapshot and restore. Aligned
    /// pointer blobs inside do not survive relocation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Handle to the root bundle.
    pub const fn root(&self) -> Bundle {
        Bundle(4)
    }

    /// Handle to the `/cx` working bundle.
    pub fn working(&self) -> Result<Bundle, VmError> {
        self.enter(self.root(), ADDR_WORKING)
    }

    /* STATUS SLOT */

    /// Read the `/sx` status slot.
    pub fn status(&self) -> Status {
        self.read_i32(STATUS_SLOT)
            .ok()
            .and_then(|v| Status::try_from(v).ok())
            .unwrap_or(Status::None)
    }

    /// Overwrite the `/sx` status slot.
    pub fn set_status(&mut self, status: Status) {
        let _ = self.write_i32(STATUS_SLOT, status.into());
    }

    /* LOW-LEVEL ACCESSORS */

    #[inline]
    fn check(&self, offset: usize, width: usize) -> Result<(), VmError> {
        if offset.checked_add(width).map_or(true, |end| end > self.buf.len()) {
            return Err(Status::Range.into());
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, VmError> {
        self.check(offset, 1)?;
        Ok(self.buf[offset])
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), VmError> {
        self.check(offset, 1)?;
        self.buf[offset] = value;
        Ok(())
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32, VmError> {
        self.check(offset, 4)?;
        let bytes: [u8; 4] = self.buf[offset..offset + 4].try_into().expect("width checked");
        Ok(i32::from_be_bytes(bytes))
    }

    pub fn write_i32(&mut self, offset: usize, value: i32) -> Result<(), VmError> {
        self.check(offset, 4)?;
        self.buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, VmError> {
        Ok(self.read_i32(offset)? as u32)
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<(), VmError> {
        self.write_i32(offset, value as i32)
    }

    pub fn read_i64(&self, offset: usize) -> Result<i64, VmError> {
        self.check(offset, 8)?;
        let bytes: [u8; 8] = self.buf[offset..offset + 8].try_into().expect("width checked");
        Ok(i64::from_be_bytes(bytes))
    }

    pub fn write_i64(&mut self, offset: usize, value: i64) -> Result<(), VmError> {
        self.check(offset, 8)?;
        self.buf[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64, VmError> {
        Ok(self.read_i64(offset)? as u64)
    }

    pub fn write_u64(&mut self, offset: usize, value: u64) -> Result<(), VmError> {
        self.write_i64(offset, value as i64)
    }

    pub fn read_f32(&self, offset: usize) -> Result<f32, VmError> {
        Ok(f32::from_bits(self.read_u32(offset)?))
    }

    pub fn write_f32(&mut self, offset: usize, value: f32) -> Result<(), VmError> {
        self.write_u32(offset, value.to_bits())
    }

    pub fn read_f64(&self, offset: usize) -> Result<f64, VmError> {
        Ok(f64::from_bits(self.read_u64(offset)?))
    }

    pub fn write_f64(&mut self, offset: usize, value: f64) -> Result<(), VmError> {
        self.write_u64(offset, value.to_bits())
    }

    /// Read an OSC timetag as its two 32-bit halves.
    pub fn read_timetag(&self, offset: usize) -> Result<(u32, u32), VmError> {
        Ok((self.read_u32(offset)?, self.read_u32(offset + 4)?))
    }

    pub fn write_timetag(&mut self, offset: usize, sec: u32, fsec: u32) -> Result<(), VmError> {
        self.write_u32(offset, sec)?;
        self.write_u32(offset + 4, fsec)
    }

    /* STRINGS */

    /// Length of the NUL-terminated string at `offset`.
    pub fn str_len(&self, offset: usize) -> Result<usize, VmError> {
        self.check(offset, 1)?;
        self.buf[offset..]
            .iter()
            .position(|&c| c == 0)
            .ok_or_else(|| Status::Range.into())
    }

    /// Encoded (padded) width of the string at `offset`.
    pub fn padded_str_len(&self, offset: usize) -> Result<usize, VmError> {
        Ok(padded_len(self.str_len(offset)?))
    }

    /// The NUL-terminated byte string at `offset`, terminator excluded.
    pub fn read_cstr(&self, offset: usize) -> Result<&[u8], VmError> {
        let len = self.str_len(offset)?;
        Ok(&self.buf[offset..offset + len])
    }

    /// The string at `offset` as UTF-8.
    pub fn read_str(&self, offset: usize) -> Result<&str, VmError> {
        core::str::from_utf8(self.read_cstr(offset)?).map_err(|_| Status::UnknownTypetag.into())
    }

    /// Write `s` at `offset`, NUL-padded to a word boundary. Returns the
    /// padded width.
    pub fn write_padded_str(&mut self, offset: usize, s: &str) -> Result<usize, VmError> {
        let width = padded_len(s.len());
        self.check(offset, width)?;
        self.buf[offset..offset + s.len()].copy_from_slice(s.as_bytes());
        self.buf[offset + s.len()..offset + width].fill(0);
        Ok(width)
    }

    /* BLOBS */

    /// Declared payload length of the blob at `offset`.
    pub fn blob_len(&self, offset: usize) -> Result<usize, VmError> {
        let len = self.read_i32(offset)?;
        if len < 0 {
            return Err(Status::Range.into());
        }
        Ok(len as usize)
    }

    /// Encoded width of the blob at `offset`: length prefix plus padded
    /// payload.
    pub fn padded_blob_size(&self, offset: usize) -> Result<usize, VmError> {
        let len = self.blob_len(offset)?;
        Ok(4 + len + blob_padding(len))
    }

    /// The blob payload at `offset`.
    pub fn read_blob(&self, offset: usize) -> Result<&[u8], VmError> {
        let len = self.blob_len(offset)?;
        self.check(offset + 4, len)?;
        Ok(&self.buf[offset + 4..offset + 4 + len])
    }

    /// Write a length-prefixed blob at `offset`, NUL-padded. Returns the
    /// encoded width.
    pub fn write_blob(&mut self, offset: usize, payload: &[u8]) -> Result<usize, VmError> {
        let width = 4 + payload.len() + blob_padding(payload.len());
        self.check(offset, width)?;
        self.write_i32(offset, payload.len() as i32)?;
        self.buf[offset + 4..offset + 4 + payload.len()].copy_from_slice(payload);
        self.buf[offset + 4 + payload.len()..offset + width].fill(0);
        Ok(width)
    }

    /* ALIGNED POINTERS */

    /// Store a machine word at `offset` behind a pad-count that brings it
    /// to its natural alignment within this arena.
    pub fn write_aligned_ptr(&mut self, offset: usize, value: usize) -> Result<(), VmError> {
        self.check(offset, ALIGNED_PTR_SIZE)?;
        self.buf[offset..offset + ALIGNED_PTR_SIZE].fill(0);
        let word = core::mem::size_of::<usize>();
        let base = self.buf.as_ptr() as usize + offset + 4;
        let pad = (word - base % word) % word;
        self.write_i32(offset, pad as i32)?;
        self.buf[offset + 4 + pad..offset + 4 + pad + word].copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    /// Read back a machine word stored by [`Arena::write_aligned_ptr`].
    pub fn read_aligned_ptr(&self, offset: usize) -> Result<usize, VmError> {
        self.check(offset, ALIGNED_PTR_SIZE)?;
        let word = core::mem::size_of::<usize>();
        let pad = self.read_i32(offset)? as usize;
        if pad >= word {
            return Err(Status::Range.into());
        }
        let bytes: [u8; core::mem::size_of::<usize>()] = self.buf
            [offset + 4 + pad..offset + 4 + pad + word]
            .try_into()
            .expect("width checked");
        Ok(usize::from_ne_bytes(bytes))
    }

    /// Recompute the pad-count for this arena's address and slide the
    /// pointer if it changed, keeping the encoding position-independent.
    pub fn align_ptr(&mut self, offset: usize) -> Result<(), VmError> {
        self.check(offset, ALIGNED_PTR_SIZE)?;
        let word = core::mem::size_of::<usize>();
        let old = self.read_i32(offset)? as usize;
        if old >= word {
            return Err(Status::Range.into());
        }
        let base = self.buf.as_ptr() as usize + offset + 4;
        let new = (word - base % word) % word;
        if new != old {
            self.write_i32(offset, new as i32)?;
            self.buf
                .copy_within(offset + 4 + old..offset + 4 + old + word, offset + 4 + new);
        }
        Ok(())
    }

    /* BUNDLE FRAMING */

    /// True when `offset` holds a `#bundle` identifier.
    pub fn is_bundle_at(&self, offset: usize) -> bool {
        self.buf.len() >= offset + BUNDLE_ID_LEN
            && self.buf[offset..offset + BUNDLE_ID_LEN] == BUNDLE_ID[..]
    }

    /// Bytes in use by `b`, header included.
    pub fn bundle_size(&self, b: Bundle) -> Result<usize, VmError> {
        let size = self.read_i32(b.size_field())?;
        if size < BUNDLE_HEADER_LEN as i32 {
            return Err(VmError::NotABundle(b.0));
        }
        Ok(size as usize)
    }

    /// Capacity in bytes of the context bundle `b`.
    pub fn bundle_total(&self, b: Bundle) -> Result<usize, VmError> {
        let total = self.read_i32(offset_by(b.0, CONTEXT_TOTAL_SIZE_OFFSET))?;
        if total < BUNDLE_HEADER_LEN as i32 {
            return Err(VmError::NotABundle(b.0));
        }
        Ok(total as usize)
    }

    /// Unused capacity of the context bundle `b`.
    pub fn space_available(&self, b: Bundle) -> Result<usize, VmError> {
        Ok(self.bundle_total(b)? - self.bundle_size(b)?)
    }

    /// Fail with `Range` unless `b` can grow by `need` bytes.
    pub(crate) fn ensure_space(&self, b: Bundle, need: usize) -> Result<(), VmError> {
        if self.space_available(b)? < need {
            return Err(Status::Range.into());
        }
        Ok(())
    }

    /// Arena offset one past the last element of `b` (the write cursor).
    pub fn end_of(&self, b: Bundle) -> Result<usize, VmError> {
        Ok(b.0 + self.bundle_size(b)?)
    }

    /// Rewrite the trailing free blob length from the current size.
    pub(crate) fn sync_free(&mut self, b: Bundle) -> Result<(), VmError> {
        let size = self.bundle_size(b)?;
        let total = self.bundle_total(b)?;
        self.write_i32(b.0 + size, (total - size) as i32)
    }

    /// Grow the context bundle `b` by `amt` bytes, zeroing the claimed
    /// region and moving the trailing free blob length.
    pub(crate) fn grow(&mut self, b: Bundle, amt: usize) -> Result<(), VmError> {
        let size = self.bundle_size(b)?;
        let total = self.bundle_total(b)?;
        let new = size + amt;
        if new > total {
            return Err(Status::Range.into());
        }
        self.buf[b.0 + size..b.0 + new].fill(0);
        self.write_i32(b.size_field(), new as i32)?;
        self.write_i32(b.0 + new, (total - new) as i32)
    }

    /// Shrink the context bundle `b` by `amt` bytes, zeroing the vacated
    /// region.
    pub(crate) fn shrink(&mut self, b: Bundle, amt: usize) -> Result<(), VmError> {
        let size = self.bundle_size(b)?;
        let total = self.bundle_total(b)?;
        if amt > size - BUNDLE_HEADER_LEN {
            return Err(Status::Range.into());
        }
        let new = size - amt;
        self.buf[b.0 + new..b.0 + size + 4].fill(0);
        self.write_i32(b.size_field(), new as i32)?;
        self.write_i32(b.0 + new, (total - new) as i32)
    }

    /* ELEMENT WALKING */

    /// True when `b` holds no elements.
    pub fn bundle_is_empty(&self, b: Bundle) -> Result<bool, VmError> {
        Ok(self.bundle_size(b)? == BUNDLE_HEADER_LEN)
    }

    /// Number of top-level elements in `b`.
    pub fn elem_count(&self, b: Bundle) -> Result<usize, VmError> {
        let size = self.bundle_size(b)?;
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        let mut count = 0;
        while offset < b.0 + size {
            offset += self.elem_size(offset)? + 4;
            count += 1;
        }
        Ok(count)
    }

    /// Fail with `ElemCount` unless `b` holds at least `n` elements.
    pub fn require_elems(&self, b: Bundle, n: usize) -> Result<(), VmError> {
        let size = self.bundle_size(b)?;
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        let mut seen = 0;
        while offset < b.0 + size && seen < n {
            offset += self.elem_size(offset)? + 4;
            seen += 1;
        }
        if seen < n {
            return Err(Status::ElemCount.into());
        }
        Ok(())
    }

    /// Content size of the element whose size field is at `offset`.
    pub fn elem_size(&self, offset: usize) -> Result<usize, VmError> {
        let size = self.read_i32(offset)?;
        if size < 0 {
            return Err(Status::Range.into());
        }
        Ok(size as usize)
    }

    /// Shape of the element at `offset`.
    pub fn elem_type(&self, offset: usize) -> Result<ElemType, VmError> {
        self.check(offset, 4)?;
        if self.is_bundle_at(offset + 4) {
            Ok(ElemType::Bundle)
        } else {
            Ok(ElemType::Message)
        }
    }

    /// Offset of the last (topmost) element of `b`; the header length when
    /// `b` is empty.
    pub fn last_elem_offset(&self, b: Bundle) -> Result<usize, VmError> {
        let size = self.bundle_size(b)?;
        if size == BUNDLE_HEADER_LEN {
            return Ok(b.0 + BUNDLE_HEADER_LEN);
        }
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        let mut elem = self.elem_size(offset)?;
        while offset + elem + 4 < b.0 + size {
            offset += elem + 4;
            elem = self.elem_size(offset)?;
        }
        Ok(offset)
    }

    /// Offsets and sizes of the top `N` elements, bottom-most first.
    pub fn top_elems<const N: usize>(&self, b: Bundle) -> Result<[(usize, usize); N], VmError> {
        self.require_elems(b, N)?;
        let size = self.bundle_size(b)?;
        let mut window = [(0usize, 0usize); N];
        let mut filled = 0;
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        while offset < b.0 + size {
            let elem = self.elem_size(offset)?;
            window.rotate_left(if filled == N { 1 } else { 0 });
            let slot = if filled < N {
                let s = filled;
                filled += 1;
                s
            } else {
                N - 1
            };
            window[slot] = (offset, elem);
            offset += elem + 4;
        }
        Ok(window)
    }

    /// Items and element count of the element at `elem_off`: if it is a
    /// bundle, its element count; if a message, its item count.
    pub fn elem_item_count(&self, elem_off: usize) -> Result<usize, VmError> {
        match self.elem_type(elem_off)? {
            ElemType::Bundle => self.elem_count(Bundle(elem_off + 4)),
            ElemType::Message => {
                let tt = elem_off + 4 + self.padded_str_len(elem_off + 4)?;
                Ok(self.str_len(tt)?.saturating_sub(1))
            }
        }
    }

    /* PAYLOAD ITEMS */

    /// Encoded width of a payload item of type `tag` at `offset`. The
    /// typetag id (comma) has width zero.
    pub fn typed_size(&self, tag: u8, offset: usize) -> Result<usize, VmError> {
        use crate::tag::TYPETAG_ID;
        if tag == TYPETAG_ID {
            return Ok(0);
        }
        let tag = TypeTag::from_byte(tag)?;
        Ok(match tag {
            TypeTag::Int32 | TypeTag::Float | TypeTag::Uint32 => 4,
            TypeTag::Int64 | TypeTag::Uint64 | TypeTag::Double | TypeTag::Timetag => 8,
            TypeTag::String | TypeTag::Symbol => self.padded_str_len(offset)?,
            TypeTag::Blob => self.padded_blob_size(offset)?,
            _ => 0,
        })
    }

    /// Logical length of a payload item, padding and prefixes excluded.
    pub fn typed_len(&self, tag: u8, offset: usize) -> Result<usize, VmError> {
        let tag = TypeTag::from_byte(tag)?;
        Ok(match tag {
            TypeTag::Int32 | TypeTag::Float | TypeTag::Uint32 => 4,
            TypeTag::Int64 | TypeTag::Uint64 | TypeTag::Double | TypeTag::Timetag => 8,
            TypeTag::String | TypeTag::Symbol => self.str_len(offset)?,
            TypeTag::Blob => self.blob_len(offset)?,
            _ => 0,
        })
    }

    /// Locate the `n`th payload item counting from the end of the message
    /// element at `elem_off`; `n == 1` is the rightmost item.
    pub fn nth_item_from_end(
        &self,
        elem_off: usize,
        n: usize,
    ) -> Result<ItemLoc, VmError> {
        debug_assert!(n > 0);
        let tt_start = elem_off + 4 + self.padded_str_len(elem_off + 4)?;
        let ntt = self.str_len(tt_start)?;
        if ntt <= n {
            return Err(Status::ItemCount.into());
        }
        let payload_start = tt_start + padded_len(ntt);
        let mut tt_off = tt_start;
        let mut item_off = payload_start;
        for _ in 0..ntt - n {
            let tag = self.read_u8(tt_off)?;
            item_off += self.typed_size(tag, item_off)?;
            tt_off += 1;
        }
        Ok(ItemLoc {
            tt_start,
            ntt,
            tt_off,
            payload_start,
            item_off,
        })
    }

    /* RAW REGION HELPERS */

    pub(crate) fn fill(&mut self, from: usize, to: usize, value: u8) {
        self.buf[from..to].fill(value);
    }

    pub(crate) fn copy_within(&mut self, src: core::ops::Range<usize>, dest: usize) {
        self.buf.copy_within(src, dest);
    }

    pub(crate) fn rotate_bytes(&mut self, range: core::ops::Range<usize>, mid: usize) {
        self.buf[range].rotate_left(mid);
    }

    pub(crate) fn splice_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), VmError> {
        self.check(offset, bytes.len())?;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Raw view of an arena region.
    pub fn bytes(&self, range: core::ops::Range<usize>) -> &[u8] {
        &self.buf[range]
    }

    /* INITIAL LAYOUT */

    /// Write a context message of exactly `size` bytes at the write cursor
    /// of `parent`, growing the parent without free-tail bookkeeping. Used
    /// only while laying out the root; everything later goes through
    /// `push_context`.
    pub(crate) fn append_context(
        &mut self,
        parent: Bundle,
        size: usize,
        address: &str,
    ) -> Result<usize, VmError> {
        debug_assert_eq!(address.len(), 3);
        debug_assert_eq!(size % 4, 0);
        if size < CONTEXT_MESSAGE_OVERHEAD {
            return Err(Status::Range.into());
        }
        let parent_size = self.bundle_size(parent)?;
        let cursor = parent.0 + parent_size;
        let free = size - CONTEXT_MESSAGE_OVERHEAD;
        self.check(cursor, size)?;
        self.write_i32(cursor, (size - 4) as i32)?;
        self.write_padded_str(cursor + 4, address)?;
        self.write_padded_str(cursor + 8, ",iiiibb")?;
        self.write_i32(cursor + 16, 0)?;
        self.write_i32(cursor + 20, 0)?;
        self.write_i32(cursor + 24, (cursor + CONTEXT_BUNDLE_OFFSET - parent.0) as i32)?;
        self.write_i32(cursor + 28, (free + BUNDLE_HEADER_LEN) as i32)?;
        self.write_i32(cursor + 32, BUNDLE_HEADER_LEN as i32)?;
        self.splice_bytes(cursor + 36, BUNDLE_ID)?;
        self.write_i32(cursor + 36 + BUNDLE_HEADER_LEN, free as i32)?;
        self.write_i32(parent.size_field(), (parent_size + size) as i32)?;
        Ok(free)
    }
}

/// Apply a signed field offset to an arena position.
pub(crate) fn offset_by(base: usize, delta: isize) -> usize {
    (base as isize + delta) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_layout_holds_status_and_working_contexts() {
        let arena = Arena::with_capacity(1024).unwrap();
        let root = arena.root();
        assert!(arena.is_bundle_at(root.base()));
        let sx = arena.enter(root, ADDR_STATUS).unwrap();
        assert!(arena.is_bundle_at(sx.base()));
        assert_eq!(arena.bundle_size(sx).unwrap(), BUNDLE_HEADER_LEN);
        assert_eq!(arena.bundle_total(sx).unwrap(), STATUS_CONTEXT_FREE + BUNDLE_HEADER_LEN);
        let cx = arena.working().unwrap();
        assert!(arena.is_bundle_at(cx.base()));
        assert!(arena.bundle_is_empty(cx).unwrap());
        assert_eq!(
            arena.space_available(cx).unwrap(),
            arena.bundle_total(cx).unwrap() - BUNDLE_HEADER_LEN
        );
    }

    #[test]
    fn status_slot_round_trips() {
        let mut arena = Arena::with_capacity(1024).unwrap();
        assert_eq!(arena.status(), Status::None);
        arena.set_status(Status::ItemType);
        assert_eq!(arena.status(), Status::ItemType);
        arena.set_status(Status::None);
        assert_eq!(arena.status(), Status::None);
    }

    #[test]
    fn accessors_are_big_endian() {
        let mut arena = Arena::with_capacity(1024).unwrap();
        let cx = arena.working().unwrap();
        let o = arena.end_of(cx).unwrap();
        arena.write_i32(o, 0x0102_0304).unwrap();
        assert_eq!(arena.bytes(o..o + 4), &[1, 2, 3, 4]);
        arena.write_i64(o, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(arena.bytes(o..o + 8), &[1, 2, 3, 4, 5, 6, 7, 8]);
        arena.write_f32(o, 1.0).unwrap();
        assert_eq!(arena.bytes(o..o + 4), &[0x3f, 0x80, 0, 0]);
    }

    #[test]
    fn reads_past_the_arena_fail_with_range() {
        let arena = Arena::with_capacity(1024).unwrap();
        let end = arena.len();
        assert!(matches!(
            arena.read_i32(end - 2),
            Err(VmError::Status(Status::Range))
        ));
        assert!(arena.read_u8(end).is_err());
    }

    #[test]
    fn aligned_ptr_survives_repadding() {
        let mut arena = Arena::with_capacity(1024).unwrap();
        let cx = arena.working().unwrap();
        let o = arena.end_of(cx).unwrap();
        let value = 0xdead_beef_usize;
        arena.write_aligned_ptr(o, value).unwrap();
        assert_eq!(arena.read_aligned_ptr(o).unwrap(), value);
        arena.align_ptr(o).unwrap();
        assert_eq!(arena.read_aligned_ptr(o).unwrap(), value);
    }

    #[test]
    fn snapshot_restore_is_a_byte_copy() {
        let arena = Arena::with_capacity(512).unwrap();
        let bytes = arena.as_bytes().to_vec();
        let copy = Arena::from_bytes(bytes).unwrap();
        assert_eq!(copy.working().unwrap(), arena.working().unwrap());
    }
}
