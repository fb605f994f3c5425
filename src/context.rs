//! Context layer
//!
//! A context message reserves a contiguous region of its parent bundle:
//! a 3-character address, a `,iiiibb` typetag string, four bookkeeping
//! ints, the inner bundle as a blob and a trailing free-space blob. The
//! inner bundle grows by consuming bytes from the free blob and never
//! moves. Contexts are allocated bump-fashion; only the last one can be
//! dropped.
//!
//! The cross-bundle transfers live here too, since they are the only
//! operations that touch two contexts at once.

use crate::arena::{offset_by, Arena, Bundle, ElemType};
use crate::consts::*;
use crate::error::{Status, VmError};

impl Arena {
    /// Append a context message of exactly `size` bytes to `parent`,
    /// claiming the bytes from the parent's free tail. Returns the free
    /// space of the new inner bundle.
    pub fn push_context(
        &mut self,
        parent: Bundle,
        size: usize,
        address: &str,
    ) -> Result<usize, VmError> {
        if address.len() != 3 || size % 4 != 0 || size < CONTEXT_MESSAGE_OVERHEAD {
            return Err(Status::Range.into());
        }
        self.ensure_space(parent, size)?;
        let free = self.append_context(parent, size, address)?;
        self.sync_free(parent)?;
        Ok(free)
    }

    /// Remove the last context message of `parent`, zeroing its footprint
    /// and returning the bytes to the parent's free tail.
    pub fn drop_context(&mut self, parent: Bundle) -> Result<(), VmError> {
        if self.bundle_is_empty(parent)? {
            return Err(Status::ElemCount.into());
        }
        let offset = self.last_elem_offset(parent)?;
        let size = self.elem_size(offset)?;
        if size + 4 < CONTEXT_MESSAGE_OVERHEAD {
            return Err(Status::ElemType.into());
        }
        self.shrink(parent, size + 4)
    }

    /// Handle to the inner bundle of the context named `address`.
    pub fn enter(&self, parent: Bundle, address: &str) -> Result<Bundle, VmError> {
        let size = self.bundle_size(parent)?;
        let mut offset = parent.0 + BUNDLE_HEADER_LEN;
        while offset < parent.0 + size {
            let elem = self.elem_size(offset)?;
            if self.read_cstr(offset + 4)? == address.as_bytes() {
                return Ok(Bundle(offset + CONTEXT_BUNDLE_OFFSET));
            }
            offset += elem + 4;
        }
        Err(VmError::UnknownContext(address.into()))
    }

    /// Handle to the bundle whose context message contains `b`.
    pub fn exit(&self, b: Bundle) -> Result<Bundle, VmError> {
        let distance = self.read_i32(offset_by(b.0, CONTEXT_PARENT_OFFSET))?;
        if distance <= 0 || distance as usize >= b.0 {
            return Err(Status::Range.into());
        }
        Ok(Bundle(b.0 - distance as usize))
    }

    /* CROSS-BUNDLE TRANSFERS */

    /// Copy the element at `src_off` (inside `src`) onto the top of
    /// `dest`.
    pub fn copy_elem_at(
        &mut self,
        src_off: usize,
        dest: Bundle,
    ) -> Result<(), VmError> {
        let width = self.elem_size(src_off)? + 4;
        let cursor = self.end_of(dest)?;
        self.grow(dest, width)?;
        self.copy_within(src_off..src_off + width, cursor);
        Ok(())
    }

    /// Copy the topmost element of `src` onto the top of `dest`.
    pub fn copy_elem(&mut self, src: Bundle, dest: Bundle) -> Result<(), VmError> {
        self.require_elems(src, 1)?;
        let offset = self.last_elem_offset(src)?;
        self.copy_elem_at(offset, dest)
    }

    /// Move the topmost element of `src` onto the top of `dest`.
    pub fn move_elem(&mut self, src: Bundle, dest: Bundle) -> Result<(), VmError> {
        self.require_elems(src, 1)?;
        let offset = self.last_elem_offset(src)?;
        let width = self.elem_size(offset)? + 4;
        self.copy_elem_at(offset, dest)?;
        self.shrink(src, width)
    }

    /// Copy the whole of `src` onto the top of `dest` as one nested
    /// bundle element.
    pub fn copy_bundle(&mut self, src: Bundle, dest: Bundle) -> Result<(), VmError> {
        let size = self.bundle_size(src)?;
        let cursor = self.end_of(dest)?;
        self.grow(dest, size + 4)?;
        self.copy_within(src.size_field()..src.0 + size, cursor);
        Ok(())
    }

    /// Move the topmost element of `src` into `dest`, splicing its
    /// children in when it is a nested bundle. Empty `src` is a no-op.
    pub fn append_bundle(&mut self, src: Bundle, dest: Bundle) -> Result<(), VmError> {
        if self.bundle_is_empty(src)? {
            return Ok(());
        }
        let offset = self.last_elem_offset(src)?;
        let size = self.elem_size(offset)?;
        if self.elem_type(offset)? == ElemType::Bundle {
            let cursor = self.end_of(dest)?;
            self.grow(dest, size - BUNDLE_HEADER_LEN)?;
            self.copy_within(
                offset + 4 + BUNDLE_HEADER_LEN..offset + 4 + size,
                cursor,
            );
        } else {
            self.copy_elem_at(offset, dest)?;
        }
        self.shrink(src, size + 4)
    }

    /// Replace the contents of `dest` with the topmost element of `src`
    /// (unwrapped when it is a bundle), consuming it from `src`.
    pub fn replace_bundle(&mut self, src: Bundle, dest: Bundle) -> Result<(), VmError> {
        let size = self.bundle_size(dest)?;
        self.shrink(dest, size - BUNDLE_HEADER_LEN)?;
        self.append_bundle(src, dest)
    }

    /// Copy the message element at `src_off` onto the top of `dest` with
    /// the first `prefix_len` bytes of its address stripped; a fully
    /// consumed address becomes the anonymous address. Returns the copied
    /// element's content size.
    pub fn route_elem(
        &mut self,
        src_off: usize,
        prefix_len: usize,
        dest: Bundle,
    ) -> Result<usize, VmError> {
        let size = self.elem_size(src_off)?;
        let addr_len = self.str_len(src_off + 4)?;
        if prefix_len > addr_len {
            return Err(Status::Range.into());
        }
        let suffix_len = addr_len - prefix_len;
        let new_addr_width = padded_len(suffix_len);
        let body_len = size - padded_len(addr_len);
        let new_size = new_addr_width + body_len;

        let cursor = self.end_of(dest)?;
        self.grow(dest, new_size + 4)?;
        self.write_i32(cursor, new_size as i32)?;
        if suffix_len > 0 {
            self.copy_within(
                src_off + 4 + prefix_len..src_off + 4 + addr_len,
                cursor + 4,
            );
            // grow zeroed the region, so padding is already in place
        }
        self.copy_within(
            src_off + 4 + padded_len(addr_len)..src_off + 4 + size,
            cursor + 4 + new_addr_width,
        );
        Ok(new_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena::with_capacity(4096).unwrap()
    }

    #[test]
    fn push_and_enter_context() {
        let mut a = arena();
        let cx = a.working().unwrap();
        let before = a.space_available(cx).unwrap();
        let free = a.push_context(cx, 256, "/t1").unwrap();
        assert_eq!(free, 256 - CONTEXT_MESSAGE_OVERHEAD);
        assert_eq!(a.space_available(cx).unwrap(), before - 256);
        let t1 = a.enter(cx, "/t1").unwrap();
        assert!(a.bundle_is_empty(t1).unwrap());
        assert_eq!(a.bundle_total(t1).unwrap(), free + BUNDLE_HEADER_LEN);
        assert_eq!(a.exit(t1).unwrap(), cx);
    }

    #[test]
    fn drop_context_returns_bytes_to_the_parent() {
        let mut a = arena();
        let cx = a.working().unwrap();
        let before = a.space_available(cx).unwrap();
        a.push_context(cx, 128, "/t1").unwrap();
        a.push_context(cx, 128, "/t2").unwrap();
        a.drop_context(cx).unwrap();
        assert!(a.enter(cx, "/t2").is_err());
        a.drop_context(cx).unwrap();
        assert_eq!(a.space_available(cx).unwrap(), before);
        assert!(a.bundle_is_empty(cx).unwrap());
    }

    #[test]
    fn grow_consumes_the_free_tail_and_shrink_restores_it() {
        let mut a = arena();
        let cx = a.working().unwrap();
        a.push_context(cx, 256, "/t1").unwrap();
        let t1 = a.enter(cx, "/t1").unwrap();
        let free = a.space_available(t1).unwrap();
        a.grow(t1, 24).unwrap();
        assert_eq!(a.space_available(t1).unwrap(), free - 24);
        let end = a.end_of(t1).unwrap();
        assert_eq!(a.read_i32(end).unwrap() as usize, free - 24);
        a.shrink(t1, 24).unwrap();
        assert_eq!(a.space_available(t1).unwrap(), free);
    }

    #[test]
    fn oversized_context_is_rejected() {
        let mut a = arena();
        let cx = a.working().unwrap();
        let avail = a.space_available(cx).unwrap();
        assert!(matches!(
            a.push_context(cx, (avail + 8) & !3, "/t1"),
            Err(VmError::Status(Status::Range))
        ));
    }
}
