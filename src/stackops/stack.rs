//! Element stack operations

use crate::arena::{Arena, Bundle};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::pattern::{match_pattern, MatchResult};

impl Arena {
    /// Remove the topmost element.
    pub fn drop_elem(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(_, s)] = self.top_elems::<1>(b)?;
        self.shrink(b, s + 4)
    }

    /// Duplicate the topmost element.
    pub fn dup(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o, s)] = self.top_elems::<1>(b)?;
        let cursor = self.end_of(b)?;
        self.grow(b, s + 4)?;
        self.copy_within(o..o + s + 4, cursor);
        Ok(())
    }

    /// Exchange the two topmost elements.
    pub fn swap(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        self.rotate_region(o1..o2 + s2 + 4, s1 + 4);
        Ok(())
    }

    /// Copy the second element to the top.
    pub fn over(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (_, _)] = self.top_elems::<2>(b)?;
        let cursor = self.end_of(b)?;
        self.grow(b, s1 + 4)?;
        self.copy_within(o1..o1 + s1 + 4, cursor);
        Ok(())
    }

    /// Remove the second element.
    pub fn nip(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        self.copy_within(o2..o2 + s2 + 4, o1);
        self.shrink(b, s1 + 4)
    }

    /// Insert a copy of the top element under the second.
    pub fn tuck(&mut self, b: Bundle) -> Result<(), VmError> {
        self.swap(b)?;
        self.over(b)
    }

    /// Rotate the third element to the top.
    pub fn rot(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), _, (o3, s3)] = self.top_elems::<3>(b)?;
        self.rotate_region(o1..o3 + s3 + 4, s1 + 4);
        Ok(())
    }

    /// Rotate the top element down to third place.
    pub fn notrot(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), _, (o3, s3)] = self.top_elems::<3>(b)?;
        let len = o3 + s3 + 4 - o1;
        self.rotate_region(o1..o3 + s3 + 4, len - (s3 + 4));
        Ok(())
    }

    pub fn two_drop(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(_, s1), (_, s2)] = self.top_elems::<2>(b)?;
        self.shrink(b, s1 + s2 + 8)
    }

    pub fn two_dup(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (_, s2)] = self.top_elems::<2>(b)?;
        let cursor = self.end_of(b)?;
        self.grow(b, s1 + s2 + 8)?;
        self.copy_within(o1..o1 + s1 + s2 + 8, cursor);
        Ok(())
    }

    pub fn two_over(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (_, s2), _, _] = self.top_elems::<4>(b)?;
        let cursor = self.end_of(b)?;
        self.grow(b, s1 + s2 + 8)?;
        self.copy_within(o1..o1 + s1 + s2 + 8, cursor);
        Ok(())
    }

    pub fn two_swap(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (_, s2), _, (o4, s4)] = self.top_elems::<4>(b)?;
        self.rotate_region(o1..o4 + s4 + 4, s1 + s2 + 8);
        Ok(())
    }

    /// Locate the element `n` positions below the top; 0 is the top.
    fn elem_from_top(&self, b: Bundle, n: usize) -> Result<(usize, usize), VmError> {
        let count = self.elem_count(b)?;
        if n >= count {
            return Err(Status::ElemCount.into());
        }
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        for _ in 0..count - 1 - n {
            offset += self.elem_size(offset)? + 4;
        }
        Ok((offset, self.elem_size(offset)?))
    }

    /// Consume an int32 `n` and duplicate the `n`th element from the top.
    pub fn pick(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        let (o, s) = self.elem_from_top(b, n as usize)?;
        let cursor = self.end_of(b)?;
        self.grow(b, s + 4)?;
        self.copy_within(o..o + s + 4, cursor);
        Ok(())
    }

    /// Consume an int32 `n` and move the `n`th element from the top to
    /// the top.
    pub fn roll(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        let (o, s) = self.elem_from_top(b, n as usize)?;
        let end = self.end_of(b)?;
        self.rotate_region(o..end, s + 4);
        Ok(())
    }

    /// Duplicate the bottom element.
    pub fn pick_bottom(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = b.0 + BUNDLE_HEADER_LEN;
        let s = self.elem_size(o)?;
        let cursor = self.end_of(b)?;
        self.grow(b, s + 4)?;
        self.copy_within(o..o + s + 4, cursor);
        Ok(())
    }

    /// Move the bottom element to the top.
    pub fn roll_bottom(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = b.0 + BUNDLE_HEADER_LEN;
        let s = self.elem_size(o)?;
        let end = self.end_of(b)?;
        self.rotate_region(o..end, s + 4);
        Ok(())
    }

    /// Find the first element whose address equals `addr`, scanning from
    /// the bottom.
    pub(crate) fn find_by_address(
        &self,
        b: Bundle,
        addr: &str,
    ) -> Result<Option<(usize, usize)>, VmError> {
        let size = self.bundle_size(b)?;
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        while offset < b.0 + size {
            let elem = self.elem_size(offset)?;
            if self.read_cstr(offset + 4)? == addr.as_bytes() {
                return Ok(Some((offset, elem)));
            }
            offset += elem + 4;
        }
        Ok(None)
    }

    pub(crate) fn roll_match_impl(&mut self, b: Bundle) -> Result<bool, VmError> {
        let addr = self.peek_str(b)?.to_owned();
        match self.find_by_address(b, &addr)? {
            Some((o, s)) => {
                self.drop_elem(b)?;
                let end = self.end_of(b)?;
                self.rotate_region(o..end, s + 4);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Consume a string, copy the first element whose address equals it
    /// to the top, and push a 0/1 success flag. On a miss the string is
    /// left in place under the flag.
    pub fn pick_match(&mut self, b: Bundle) -> Result<(), VmError> {
        let addr = self.peek_str(b)?.to_owned();
        let hit = match self.find_by_address(b, &addr)? {
            Some((o, s)) => {
                self.drop_elem(b)?;
                let cursor = self.end_of(b)?;
                self.grow(b, s + 4)?;
                self.copy_within(o..o + s + 4, cursor);
                true
            }
            None => false,
        };
        self.push_i32(b, hit as i32)
    }

    /// [`Arena::pick_match`] with the string interpreted as an OSC
    /// pattern address.
    pub fn pick_pmatch(&mut self, b: Bundle) -> Result<(), VmError> {
        let addr = self.peek_str(b)?.to_owned();
        let count = self.elem_count(b)?;
        let mut offset = b.0 + BUNDLE_HEADER_LEN;
        let mut found = None;
        for _ in 0..count {
            let size = self.elem_size(offset)?;
            let pattern = self.read_str(offset + 4)?;
            if match_pattern(pattern, &addr)
                .result
                .contains(MatchResult::ADDRESS_COMPLETE)
            {
                found = Some((offset, size));
                break;
            }
            offset += size + 4;
        }
        let hit = match found {
            Some((o, s)) => {
                self.drop_elem(b)?;
                let cursor = self.end_of(b)?;
                self.grow(b, s + 4)?;
                self.copy_within(o..o + s + 4, cursor);
                true
            }
            None => false,
        };
        self.push_i32(b, hit as i32)
    }

    /// Consume a string, move the first element whose address equals it
    /// to the top, and push a 0/1 success flag.
    pub fn roll_match(&mut self, b: Bundle) -> Result<(), VmError> {
        let hit = self.roll_match_impl(b)?;
        self.push_i32(b, hit as i32)
    }

    /// Intentionally undefined in the source design.
    pub fn roll_pmatch(&mut self, _b: Bundle) -> Result<(), VmError> {
        Err(VmError::NotImplemented("/roll/pmatch"))
    }
}
