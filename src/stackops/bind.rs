//! Binding: replace, assign, lookup
//!
//! A container bundle on the stack doubles as an environment: bindings
//! are messages whose address is the bound name.

use crate::arena::{Arena, Bundle, ElemType};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::stackops::Composer;
use crate::tag::TypeTag;

impl Arena {
    /// Overwrite the first element of the container bundle below whose
    /// address equals the top message's address; append the message as a
    /// new binding when none matches. The message is consumed.
    pub fn replace(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (o2, s2)] = self.top_elems::<2>(b)?;
        if self.elem_type(o1)? != ElemType::Bundle || self.elem_type(o2)? != ElemType::Message {
            return Err(Status::ElemType.into());
        }
        let addr = self.read_cstr(o2 + 4)?.to_vec();
        let mut found = None;
        let mut child = o1 + 4 + BUNDLE_HEADER_LEN;
        while child < o1 + 4 + s1 {
            let cs = self.elem_size(child)?;
            if self.read_cstr(child + 4)? == addr.as_slice() {
                found = Some((child, cs));
                break;
            }
            child += cs + 4;
        }
        let Some((oc, cs)) = found else {
            return self.push(b);
        };
        self.resize_region(b, oc, cs + 4, s2 + 4)?;
        let moved = (o2 as isize + (s2 as isize - cs as isize)) as usize;
        self.copy_within(moved..moved + s2 + 4, oc);
        let container = (s1 as isize + s2 as isize - cs as isize) as usize;
        self.write_i32(o1, container as i32)?;
        self.shrink(b, s2 + 4)
    }

    /// Bind the value element under the name carried by the string on
    /// top, installing the binding into the container bundle below both:
    /// `[container, value, name]` becomes `[container]` with the binding
    /// inside. A bundle value is wrapped into a blob first.
    pub fn assign(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, _), (o2, _), (_, _)] = self.top_elems::<3>(b)?;
        if self.elem_type(o1)? != ElemType::Bundle {
            return Err(Status::ElemType.into());
        }
        if self.elem_type(o2)? == ElemType::Bundle {
            self.swap(b)?;
            self.elem_to_blob(b)?;
            self.swap(b)?;
        }
        let [_, (o2, s2), (o3, _)] = self.top_elems::<3>(b)?;
        let loc = self.nth_item_from_end(o3, 1)?;
        let tag = TypeTag::from_byte(self.read_u8(loc.tt_off)?)?;
        if !tag.is_string() {
            return Err(Status::ItemType.into());
        }
        let name = self.read_str(loc.item_off)?.to_owned();

        let addr2_width = self.padded_str_len(o2 + 4)?;
        let body = s2 - addr2_width;
        let new_size = padded_len(name.len()) + body;
        self.ensure_space(b, new_size + 4)?;
        let scratch = self.end_of(b)?;
        let mut w = Composer::at(scratch);
        w.put_i32(self, new_size as i32)?;
        w.put_padded_str(self, &name)?;
        w.put_copy(self, o2 + 4 + addr2_width..o2 + 4 + s2)?;
        let len = w.len();
        self.commit_scratch(b, o2, len)?;
        self.replace(b)
    }

    /// Look the string on top up in the container bundle below and push
    /// a copy of the bound element; an anonymous empty message on a
    /// miss. The name is consumed; the container stays.
    pub fn lookup(&mut self, b: Bundle) -> Result<(), VmError> {
        let [(o1, s1), (o2, _)] = self.top_elems::<2>(b)?;
        if self.elem_type(o1)? != ElemType::Bundle {
            return Err(Status::ElemType.into());
        }
        let loc = self.nth_item_from_end(o2, 1)?;
        let tag = TypeTag::from_byte(self.read_u8(loc.tt_off)?)?;
        if !tag.is_string() {
            return Err(Status::ItemType.into());
        }
        let name = self.read_cstr(loc.item_off)?.to_vec();

        let mut child = o1 + 4 + BUNDLE_HEADER_LEN;
        while child < o1 + 4 + s1 {
            let cs = self.elem_size(child)?;
            if self.read_cstr(child + 4)? == name.as_slice() {
                self.drop_elem(b)?;
                return self.copy_elem_at(child, b);
            }
            child += cs + 4;
        }
        self.drop_elem(b)?;
        self.push_message(b, ANON_ADDRESS, &[])
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
    fn replace_appends_then_overwrites() {
        let (mut a, b) = stack();
        a.push_bundle(b).unwrap();
        a.push_message(b, "/x", &[Item::I32(1)]).unwrap();
        a.replace(b).unwrap();
        assert_eq!(a.elem_count(b).unwrap(), 1);
        let o = a.last_elem_offset(b).unwrap();
        assert_eq!(a.elem_item_count(o).unwrap(), 1);

        // overwriting with a wider value
        a.push_message(b, "/x", &[Item::Str("wider value")]).unwrap();
        a.replace(b).unwrap();
        let o = a.last_elem_offset(b).unwrap();
        let children = {
            let s = a.elem_size(o).unwrap();
            let mut v = Vec::new();
            let mut c = o + 4 + BUNDLE_HEADER_LEN;
            while c < o + 4 + s {
                v.push(c);
                c += a.elem_size(c).unwrap() + 4;
            }
            v
        };
        assert_eq!(children.len(), 1);
        let loc = a.nth_item_from_end(children[0], 1).unwrap();
        assert_eq!(a.read_str(loc.item_off).unwrap(), "wider value");
    }

    #[test]
    fn assign_installs_a_binding() {
        let (mut a, b) = stack();
        a.push_bundle(b).unwrap();
        a.push_i32(b, 5).unwrap();
        a.push_string(b, "/x").unwrap();
        a.assign(b).unwrap();
        assert_eq!(a.elem_count(b).unwrap(), 1);

        a.push_string(b, "/x").unwrap();
        a.lookup(b).unwrap();
        assert_eq!(a.pop_i32(b).unwrap(), 5);
    }

    #[test]
    fn assign_wraps_bundle_values() {
        let (mut a, b) = stack();
        a.push_bundle(b).unwrap();
        a.push_bundle(b).unwrap();
        a.push_string(b, "/prog").unwrap();
        a.assign(b).unwrap();
        a.push_string(b, "/prog").unwrap();
        a.lookup(b).unwrap();
        assert_eq!(a.peek_item_tag(b).unwrap(), Some(TypeTag::Blob));
        let blob = a.peek_blob(b).unwrap();
        assert_eq!(blob[..8], BUNDLE_ID[..]);
    }

    #[test]
    fn lookup_miss_pushes_an_empty_message() {
        let (mut a, b) = stack();
        a.push_bundle(b).unwrap();
        a.push_string(b, "/missing").unwrap();
        a.lookup(b).unwrap();
        assert_eq!(a.peek_address(b).unwrap(), "");
        let o = a.last_elem_offset(b).unwrap();
        assert_eq!(a.elem_item_count(o).unwrap(), 0);
    }
}
