//! Arithmetic and comparison on payload items
//!
//! Binary operations consume the two topmost message elements and push
//! the result of `top ⊙ second`. Both rightmost items must carry the
//! same numeric tag; a mismatch reports `ItemType` and leaves the stack
//! unchanged.

use crate::arena::{Arena, Bundle};
use crate::error::{Status, VmError};
use crate::tag::TypeTag;

#[derive(Debug, Clone, Copy)]
enum Num {
    I32(i32),
    F32(f32),
    I64(i64),
    F64(f64),
    U32(u32),
    U64(u64),
}

impl Arena {
    fn read_num(&self, elem_off: usize) -> Result<Num, VmError> {
        let loc = self.nth_item_from_end(elem_off, 1)?;
        let tag = TypeTag::from_byte(self.read_u8(loc.tt_off)?)?;
        Ok(match tag {
            TypeTag::Int32 => Num::I32(self.read_i32(loc.item_off)?),
            TypeTag::Float => Num::F32(self.read_f32(loc.item_off)?),
            TypeTag::Int64 => Num::I64(self.read_i64(loc.item_off)?),
            TypeTag::Double => Num::F64(self.read_f64(loc.item_off)?),
            TypeTag::Uint32 => Num::U32(self.read_u32(loc.item_off)?),
            TypeTag::Uint64 => Num::U64(self.read_u64(loc.item_off)?),
            _ => return Err(Status::ItemType.into()),
        })
    }

    /// The rightmost items of the two top elements, top first, same tag
    /// required.
    fn binary_operands(&self, b: Bundle) -> Result<(Num, Num), VmError> {
        let [(o1, _), (o2, _)] = self.top_elems::<2>(b)?;
        let second = self.read_num(o1)?;
        let top = self.read_num(o2)?;
        if core::mem::discriminant(&top) != core::mem::discriminant(&second) {
            return Err(Status::ItemType.into());
        }
        Ok((top, second))
    }

    fn push_num(&mut self, b: Bundle, v: Num) -> Result<(), VmError> {
        match v {
            Num::I32(v) => self.push_i32(b, v),
            Num::F32(v) => self.push_f32(b, v),
            Num::I64(v) => self.push_i64(b, v),
            Num::F64(v) => self.push_f64(b, v),
            Num::U32(v) => self.push_u32(b, v),
            Num::U64(v) => self.push_u64(b, v),
        }
    }

    fn binary_num<FI, FF>(&mut self, b: Bundle, int: FI, float: FF) -> Result<(), VmError>
    where
        FI: Fn(i64, i64) -> Option<i64>,
        FF: Fn(f64, f64) -> f64,
    {
        let (top, second) = self.binary_operands(b)?;
        let result = match (top, second) {
            (Num::I32(a), Num::I32(c)) => Num::I32(
                int(a as i64, c as i64).ok_or(VmError::from(Status::Range))? as i32,
            ),
            (Num::I64(a), Num::I64(c)) => {
                Num::I64(int(a, c).ok_or(VmError::from(Status::Range))?)
            }
            (Num::U32(a), Num::U32(c)) => Num::U32(
                int(a as i64, c as i64).ok_or(VmError::from(Status::Range))? as u32,
            ),
            (Num::U64(a), Num::U64(c)) => Num::U64(
                int(a as i64, c as i64).ok_or(VmError::from(Status::Range))? as u64,
            ),
            (Num::F32(a), Num::F32(c)) => Num::F32(float(a as f64, c as f64) as f32),
            (Num::F64(a), Num::F64(c)) => Num::F64(float(a, c)),
            _ => return Err(Status::ItemType.into()),
        };
        self.two_drop(b)?;
        self.push_num(b, result)
    }

    pub fn add(&mut self, b: Bundle) -> Result<(), VmError> {
        self.binary_num(b, |a, c| Some(a.wrapping_add(c)), |a, c| a + c)
    }

    pub fn sub(&mut self, b: Bundle) -> Result<(), VmError> {
        self.binary_num(b, |a, c| Some(a.wrapping_sub(c)), |a, c| a - c)
    }

    pub fn mul(&mut self, b: Bundle) -> Result<(), VmError> {
        self.binary_num(b, |a, c| Some(a.wrapping_mul(c)), |a, c| a * c)
    }

    pub fn div(&mut self, b: Bundle) -> Result<(), VmError> {
        self.binary_num(b, |a, c| a.checked_div(c), |a, c| a / c)
    }

    pub fn rem(&mut self, b: Bundle) -> Result<(), VmError> {
        self.binary_num(b, |a, c| a.checked_rem(c), |a, c| a % c)
    }

    pub fn pow(&mut self, b: Bundle) -> Result<(), VmError> {
        self.binary_num(
            b,
            |a, c| Some((a as f64).powf(c as f64) as i64),
            |a, c| a.powf(c),
        )
    }

    /// Negate the rightmost numeric item of the top element.
    pub fn neg(&mut self, b: Bundle) -> Result<(), VmError> {
        self.require_elems(b, 1)?;
        let o = self.last_elem_offset(b)?;
        let v = self.read_num(o)?;
        let result = match v {
            Num::I32(v) => Num::I32(v.wrapping_neg()),
            Num::F32(v) => Num::F32(-v),
            Num::I64(v) => Num::I64(v.wrapping_neg()),
            Num::F64(v) => Num::F64(-v),
            Num::U32(_) | Num::U64(_) => return Err(Status::ItemType.into()),
        };
        self.drop_elem(b)?;
        self.push_num(b, result)
    }

    /// Byte equality of the two top elements' typetags and payloads,
    /// addresses ignored. Consumes both, pushes a 0/1 flag.
    pub fn eql(&mut self, b: Bundle) -> Result<(), VmError> {
        let flag = self.content_eq(b)?;
        self.two_drop(b)?;
        self.push_i32(b, flag as i32)
    }

    /// Negated [`Arena::eql`].
    pub fn neq(&mut self, b: Bundle) -> Result<(), VmError> {
        let flag = self.content_eq(b)?;
        self.two_drop(b)?;
        self.push_i32(b, !flag as i32)
    }

    fn content_eq(&self, b: Bundle) -> Result<bool, VmError> {
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        let tt1 = o1 + 4 + self.padded_str_len(o1 + 4)?;
        let tt2 = o2 + 4 + self.padded_str_len(o2 + 4)?;
        let l1 = s1 - (tt1 - (o1 + 4));
        let l2 = s2 - (tt2 - (o2 + 4));
        Ok(l1 == l2 && self.bytes(tt1..tt1 + l1) == self.bytes(tt2..tt2 + l2))
    }

    fn compare<F>(&mut self, b: Bundle, f: F) -> Result<(), VmError>
    where
        F: Fn(f64, f64) -> bool,
    {
        let (top, second) = self.binary_operands(b)?;
        let flag = match (top, second) {
            (Num::I32(a), Num::I32(c)) => f(a as f64, c as f64),
            (Num::I64(a), Num::I64(c)) => f(a as f64, c as f64),
            (Num::U32(a), Num::U32(c)) => f(a as f64, c as f64),
            (Num::U64(a), Num::U64(c)) => f(a as f64, c as f64),
            (Num::F32(a), Num::F32(c)) => f(a as f64, c as f64),
            (Num::F64(a), Num::F64(c)) => f(a, c),
            _ => return Err(Status::ItemType.into()),
        };
        self.two_drop(b)?;
        self.push_i32(b, flag as i32)
    }

    /// Push 1 when top ≤ second.
    pub fn lte(&mut self, b: Bundle) -> Result<(), VmError> {
        self.compare(b, |a, c| a <= c)
    }

    /// Push 1 when top < second.
    pub fn lt(&mut self, b: Bundle) -> Result<(), VmError> {
        self.compare(b, |a, c| a < c)
    }

    /// Logical AND of the two top int32 items.
    pub fn and(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), (o2, _)] = self.top_elems::<2>(b)?;
        let a = self.int_item(o2)?;
        let c = self.int_item(o1)?;
        self.two_drop(b)?;
        self.push_i32(b, (a != 0 && c != 0) as i32)
    }

    /// Logical OR of the two top int32 items.
    pub fn or(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), (o2, _)] = self.top_elems::<2>(b)?;
        let a = self.int_item(o2)?;
        let c = self.int_item(o1)?;
        self.two_drop(b)?;
        self.push_i32(b, (a != 0 || c != 0) as i32)
    }

    fn int_item(&self, elem_off: usize) -> Result<i32, VmError> {
        match self.read_num(elem_off)? {
            Num::I32(v) => Ok(v),
            _ => Err(Status::ItemType.into()),
        }
    }

    /// Consume an int32 size and push a zeroed blob of that length.
    pub fn make_blob(&mut self, b: Bundle) -> Result<(), VmError> {
        let n = self.pop_i32(b)?;
        if n < 0 {
            return Err(Status::Range.into());
        }
        let zeros = vec![0u8; n as usize];
        self.push_blob(b, &zeros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> (Arena, Bundle) {
        let a = Arena::with_capacity(4096).unwrap();
        let b = a.working().unwrap();
        (a, b)
    }

    #[test]
    fn add_leaves_a_single_sum() {
        let (mut a, b) = stack();
        a.push_i32(b, 1).unwrap();
        a.push_i32(b, 2).unwrap();
        a.add(b).unwrap();
        assert_eq!(a.elem_count(b).unwrap(), 1);
        assert_eq!(a.pop_i32(b).unwrap(), 3);
    }

    #[test]
    fn sub_and_div_take_top_against_second() {
        let (mut a, b) = stack();
        a.push_i32(b, 3).unwrap();
        a.push_i32(b, 10).unwrap();
        a.sub(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 7);

        a.push_f32(b, 2.0).unwrap();
        a.push_f32(b, 9.0).unwrap();
        a.div(b).unwrap();
        assert_eq!(a.pop_f32(b).unwrap(), 4.5);
    }

    #[test]
    fn mismatched_tags_leave_the_stack_unchanged() {
        let (mut a, b) = stack();
        a.push_i32(b, 1).unwrap();
        a.push_f32(b, 2.0).unwrap();
        assert!(matches!(
            a.add(b),
            Err(VmError::Status(Status::ItemType))
        ));
        assert_eq!(a.elem_count(b).unwrap(), 2);
        assert_eq!(a.pop_f32(b).unwrap(), 2.0);
        assert_eq!(a.pop_i32(b).unwrap(), 1);
    }

    #[test]
    fn division_by_zero_is_a_range_error() {
        let (mut a, b) = stack();
        a.push_i32(b, 0).unwrap();
        a.push_i32(b, 1).unwrap();
        assert!(matches!(
            a.div(b),
            Err(VmError::Status(Status::Range))
        ));
        assert_eq!(a.elem_count(b).unwrap(), 2);
    }

    #[test]
    fn comparisons_and_logic() {
        let (mut a, b) = stack();
        a.push_i32(b, 5).unwrap();
        a.push_i32(b, 3).unwrap();
        a.lt(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 1);

        a.push_i32(b, 4).unwrap();
        a.push_i32(b, 4).unwrap();
        a.lte(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 1);

        a.push_i32(b, 1).unwrap();
        a.push_i32(b, 0).unwrap();
        a.and(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 0);
        a.push_i32(b, 1).unwrap();
        a.push_i32(b, 0).unwrap();
        a.or(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 1);
    }

    #[test]
    fn eql_compares_types_and_payloads() {
        let (mut a, b) = stack();
        a.push_i32(b, 2).unwrap();
        a.push_f32(b, 2.0).unwrap();
        a.eql(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 0);

        a.push_string(b, "same").unwrap();
        a.push_string(b, "same").unwrap();
        a.eql(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 1);
    }

    #[test]
    fn neg_flips_sign() {
        let (mut a, b) = stack();
        a.push_i32(b, 6).unwrap();
        a.neg(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), -6);
        a.push_f32(b, -1.5).unwrap();
        a.neg(b).unwrap();
        assert_eq!(a.pop_f32(b).unwrap(), 1.5);
    }

    #[test]
    fn make_blob_pushes_zeroed_payload() {
        let (mut a, b) = stack();
        a.push_i32(b, 5).unwrap();
        a.make_blob(b).unwrap();
        assert_eq!(a.peek_blob(b).unwrap(), &[0, 0, 0, 0, 0]);
    }
}
