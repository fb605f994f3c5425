//! Typed push, peek and pop

use crate::arena::{Arena, Bundle, ElemType, ItemLoc, ALIGNED_PTR_SIZE};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::tag::{TypeTag, TYPETAG_ID};

/// One payload datum for [`Arena::push_message`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'a> {
    I32(i32),
    F32(f32),
    F64(f64),
    I64(i64),
    U32(u32),
    U64(u64),
    Str(&'a str),
    Sym(&'a str),
    Blob(&'a [u8]),
    Timetag(u32, u32),
    True,
    False,
    Null,
    Infinitum,
}

impl Item<'_> {
    pub fn tag(&self) -> TypeTag {
        match self {
            Item::I32(_) => TypeTag::Int32,
            Item::F32(_) => TypeTag::Float,
            Item::F64(_) => TypeTag::Double,
            Item::I64(_) => TypeTag::Int64,
            Item::U32(_) => TypeTag::Uint32,
            Item::U64(_) => TypeTag::Uint64,
            Item::Str(_) => TypeTag::String,
            Item::Sym(_) => TypeTag::Symbol,
            Item::Blob(_) => TypeTag::Blob,
            Item::Timetag(..) => TypeTag::Timetag,
            Item::True => TypeTag::True,
            Item::False => TypeTag::False,
            Item::Null => TypeTag::Null,
            Item::Infinitum => TypeTag::Infinitum,
        }
    }

    fn width(&self) -> usize {
        match self {
            Item::I32(_) | Item::F32(_) | Item::U32(_) => 4,
            Item::F64(_) | Item::I64(_) | Item::U64(_) | Item::Timetag(..) => 8,
            Item::Str(s) | Item::Sym(s) => padded_len(s.len()),
            Item::Blob(p) => 4 + p.len() + blob_padding(p.len()),
            Item::True | Item::False | Item::Null | Item::Infinitum => 0,
        }
    }
}

impl Arena {
    /// Append a message element with the given address and payload items.
    pub fn push_message(
        &mut self,
        b: Bundle,
        address: &str,
        items: &[Item],
    ) -> Result<(), VmError> {
        let addr_width = padded_len(address.len());
        let tt_width = padded_len(1 + items.len());
        let payload_width: usize = items.iter().map(Item::width).sum();
        let content = addr_width + tt_width + payload_width;
        let cursor = self.end_of(b)?;
        self.grow(b, content + 4)?;

        self.write_i32(cursor, content as i32)?;
        self.write_padded_str(cursor + 4, address)?;
        let tt = cursor + 4 + addr_width;
        self.write_u8(tt, TYPETAG_ID)?;
        for (i, item) in items.iter().enumerate() {
            self.write_u8(tt + 1 + i, item.tag().to_byte())?;
        }
        // grow zeroed the region, so the typetag padding is in place
        let mut at = tt + tt_width;
        for item in items {
            at += self.write_item(at, item)?;
        }
        Ok(())
    }

    fn write_item(&mut self, at: usize, item: &Item) -> Result<usize, VmError> {
        let width = item.width();
        match *item {
            Item::I32(v) => self.write_i32(at, v)?,
            Item::F32(v) => self.write_f32(at, v)?,
            Item::F64(v) => self.write_f64(at, v)?,
            Item::I64(v) => self.write_i64(at, v)?,
            Item::U32(v) => self.write_u32(at, v)?,
            Item::U64(v) => self.write_u64(at, v)?,
            Item::Str(s) | Item::Sym(s) => {
                self.write_padded_str(at, s)?;
            }
            Item::Blob(p) => {
                self.write_blob(at, p)?;
            }
            Item::Timetag(sec, fsec) => self.write_timetag(at, sec, fsec)?,
            Item::True | Item::False | Item::Null | Item::Infinitum => {}
        }
        Ok(width)
    }

    pub fn push_i32(&mut self, b: Bundle, v: i32) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::I32(v)])
    }

    pub fn push_f32(&mut self, b: Bundle, v: f32) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::F32(v)])
    }

    pub fn push_f64(&mut self, b: Bundle, v: f64) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::F64(v)])
    }

    pub fn push_i64(&mut self, b: Bundle, v: i64) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::I64(v)])
    }

    pub fn push_u32(&mut self, b: Bundle, v: u32) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::U32(v)])
    }

    pub fn push_u64(&mut self, b: Bundle, v: u64) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::U64(v)])
    }

    pub fn push_string(&mut self, b: Bundle, s: &str) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::Str(s)])
    }

    pub fn push_symbol(&mut self, b: Bundle, s: &str) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::Sym(s)])
    }

    pub fn push_blob(&mut self, b: Bundle, payload: &[u8]) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::Blob(payload)])
    }

    pub fn push_timetag(&mut self, b: Bundle, sec: u32, fsec: u32) -> Result<(), VmError> {
        self.push_message(b, ANON_ADDRESS, &[Item::Timetag(sec, fsec)])
    }

    pub fn push_unit(&mut self, b: Bundle, tag: TypeTag) -> Result<(), VmError> {
        let item = match tag {
            TypeTag::True => Item::True,
            TypeTag::False => Item::False,
            TypeTag::Null => Item::Null,
            TypeTag::Infinitum => Item::Infinitum,
            _ => return Err(Status::ItemType.into()),
        };
        self.push_message(b, ANON_ADDRESS, &[item])
    }

    /// Append an empty nested bundle element.
    pub fn push_bundle(&mut self, b: Bundle) -> Result<(), VmError> {
        let cursor = self.end_of(b)?;
        self.grow(b, 4 + BUNDLE_HEADER_LEN)?;
        self.write_i32(cursor, BUNDLE_HEADER_LEN as i32)?;
        self.splice_bytes(cursor + 4, BUNDLE_ID)
    }

    /// Push a blob carrying a machine word behind an alignment pad.
    pub fn push_aligned_ptr(&mut self, b: Bundle, raw: usize) -> Result<(), VmError> {
        self.push_blob(b, &[0u8; ALIGNED_PTR_SIZE])?;
        let end = self.end_of(b)?;
        self.write_aligned_ptr(end - ALIGNED_PTR_SIZE, raw)
    }

    /* PEEK */

    /// Shape of the topmost element.
    pub fn peek_elem_type(&self, b: Bundle) -> Result<ElemType, VmError> {
        self.require_elems(b, 1)?;
        let offset = self.last_elem_offset(b)?;
        self.elem_type(offset)
    }

    /// Address of the topmost element.
    pub fn peek_address(&self, b: Bundle) -> Result<&str, VmError> {
        self.require_elems(b, 1)?;
        let offset = self.last_elem_offset(b)?;
        self.read_str(offset + 4)
    }

    /// Type tag of the rightmost payload item of the topmost element;
    /// `None` when the message carries no items.
    pub fn peek_item_tag(&self, b: Bundle) -> Result<Option<TypeTag>, VmError> {
        self.require_elems(b, 1)?;
        let offset = self.last_elem_offset(b)?;
        if self.elem_type(offset)? == ElemType::Bundle {
            return Err(Status::ElemType.into());
        }
        match self.nth_item_from_end(offset, 1) {
            Ok(loc) => Ok(Some(TypeTag::from_byte(self.read_u8(loc.tt_off)?)?)),
            Err(VmError::Status(Status::ItemCount)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Locate the rightmost payload item of the topmost element, checking
    /// its tag against `want`.
    pub(crate) fn top_item(&self, b: Bundle, want: Option<TypeTag>) -> Result<ItemLoc, VmError> {
        self.require_elems(b, 1)?;
        let offset = self.last_elem_offset(b)?;
        if self.elem_type(offset)? == ElemType::Bundle {
            return Err(Status::ElemType.into());
        }
        let loc = self.nth_item_from_end(offset, 1)?;
        if let Some(want) = want {
            let got = TypeTag::from_byte(self.read_u8(loc.tt_off)?)?;
            let matches = match want {
                TypeTag::String => got.is_string(),
                TypeTag::Int32 => got == TypeTag::Int32,
                _ => got == want,
            };
            if !matches {
                return Err(Status::ItemType.into());
            }
        }
        Ok(loc)
    }

    pub fn peek_i32(&self, b: Bundle) -> Result<i32, VmError> {
        let loc = self.top_item(b, Some(TypeTag::Int32))?;
        self.read_i32(loc.item_off)
    }

    pub fn peek_f32(&self, b: Bundle) -> Result<f32, VmError> {
        let loc = self.top_item(b, Some(TypeTag::Float))?;
        self.read_f32(loc.item_off)
    }

    pub fn peek_str(&self, b: Bundle) -> Result<&str, VmError> {
        let loc = self.top_item(b, Some(TypeTag::String))?;
        self.read_str(loc.item_off)
    }

    pub fn peek_blob(&self, b: Bundle) -> Result<&[u8], VmError> {
        let loc = self.top_item(b, Some(TypeTag::Blob))?;
        self.read_blob(loc.item_off)
    }

    /// Read back a machine word pushed with [`Arena::push_aligned_ptr`],
    /// repadding it for this arena first.
    pub fn peek_aligned_ptr(&mut self, b: Bundle) -> Result<usize, VmError> {
        let loc = self.top_item(b, Some(TypeTag::Blob))?;
        if self.blob_len(loc.item_off)? != ALIGNED_PTR_SIZE {
            return Err(Status::ItemType.into());
        }
        self.align_ptr(loc.item_off + 4)?;
        self.read_aligned_ptr(loc.item_off + 4)
    }

    /* POP */

    pub fn pop_i32(&mut self, b: Bundle) -> Result<i32, VmError> {
        let v = self.peek_i32(b)?;
        self.drop_elem(b)?;
        Ok(v)
    }

    pub fn pop_f32(&mut self, b: Bundle) -> Result<f32, VmError> {
        let v = self.peek_f32(b)?;
        self.drop_elem(b)?;
        Ok(v)
    }

    pub fn pop_string(&mut self, b: Bundle) -> Result<String, VmError> {
        let v = self.peek_str(b)?.to_owned();
        self.drop_elem(b)?;
        Ok(v)
    }

    pub fn pop_blob(&mut self, b: Bundle) -> Result<Vec<u8>, VmError> {
        let v = self.peek_blob(b)?.to_vec();
        self.drop_elem(b)?;
        Ok(v)
    }
}
