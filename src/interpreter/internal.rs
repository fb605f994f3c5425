//! Environment access, coercions and context transfers

use super::Vm;
use crate::arena::ElemType;
use crate::error::VmError;
use crate::tag::TypeTag;

impl Vm {
    /// Bind the stack contents under the name on top: everything below
    /// the name is merged into one message, the name becomes its
    /// address, and the binding replaces any existing one in the
    /// Environment. The Stack is left empty.
    pub fn assign_stack_to_env(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let env = self.env();
        let name = self.require_string_top()?;

        // an empty name would match its own search message below
        if !(name.is_empty() && self.arena.bundle_is_empty(env)?) {
            self.arena.push_string(env, &name)?;
            while self.arena.roll_match_impl(env)? {
                self.arena.drop_elem(env)?;
                self.arena.push_string(env, &name)?;
            }
            self.arena.drop_elem(env)?;
        }

        loop {
            if self.arena.elem_count(stack)? == 1 {
                break;
            }
            self.arena.swap(stack)?;
            if self.arena.peek_elem_type(stack)? == ElemType::Bundle {
                self.arena.elem_to_blob(stack)?;
            }
            self.arena.swap(stack)?;
            self.arena.push(stack)?;
        }
        self.arena.move_string_to_address(stack)?;
        self.arena.move_elem(stack, env)?;
        self.arena.clear_elems(stack)
    }

    /// Resolve the name on top of the Stack: first by address equality
    /// in the Environment, then in the symbol table, which yields a
    /// native-function pointer blob. An unresolved name stays put.
    pub fn lookup_in_env(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let env = self.env();
        let name = self.require_string_top()?;

        if let Some((offset, _)) = self.arena.find_by_address(env, &name)? {
            self.arena.drop_elem(stack)?;
            return self.arena.copy_elem_at(offset, stack);
        }
        if let Some(f) = self.symtab().lookup(&name) {
            self.arena.drop_elem(stack)?;
            return self.arena.push_aligned_ptr(stack, f as usize);
        }
        Ok(())
    }

    /* COERCIONS */

    /// Coerce the top payload item to int32.
    pub fn coerce_i32(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        match self.arena.peek_item_tag(stack)? {
            Some(TypeTag::Int32) => Ok(()),
            Some(TypeTag::Float) => {
                let f = self.arena.pop_f32(stack)?;
                self.arena.push_i32(stack, f as i32)
            }
            Some(tag) if tag.is_string() => {
                let s = self.arena.peek_str(stack)?;
                let v = parse_i32_prefix(s.strip_prefix('/').unwrap_or(s));
                self.arena.drop_elem(stack)?;
                self.arena.push_i32(stack, v)
            }
            Some(TypeTag::Blob) => {
                let blob = self.arena.peek_blob(stack)?;
                if blob.len() == 4 {
                    let v = i32::from_be_bytes(blob.try_into().expect("length checked"));
                    self.arena.drop_elem(stack)?;
                    self.arena.push_i32(stack, v)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Coerce the top payload item to float.
    pub fn coerce_f32(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        match self.arena.peek_item_tag(stack)? {
            Some(TypeTag::Float) => Ok(()),
            Some(TypeTag::Int32) => {
                let v = self.arena.pop_i32(stack)?;
                self.arena.push_f32(stack, v as f32)
            }
            Some(tag) if tag.is_string() => {
                let s = self.arena.peek_str(stack)?;
                let v = parse_f32_prefix(s.strip_prefix('/').unwrap_or(s));
                self.arena.drop_elem(stack)?;
                self.arena.push_f32(stack, v)
            }
            Some(TypeTag::Blob) => {
                let blob = self.arena.peek_blob(stack)?;
                if blob.len() == 4 {
                    let v = f32::from_bits(u32::from_be_bytes(
                        blob.try_into().expect("length checked"),
                    ));
                    self.arena.drop_elem(stack)?;
                    self.arena.push_f32(stack, v)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Coerce the top payload item to string.
    pub fn coerce_string(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        match self.arena.peek_item_tag(stack)? {
            Some(tag) if tag.is_string() => Ok(()),
            Some(TypeTag::Int32) => {
                let v = self.arena.pop_i32(stack)?;
                self.arena.push_string(stack, &v.to_string())
            }
            Some(TypeTag::Float) => {
                let v = self.arena.pop_f32(stack)?;
                self.arena.push_string(stack, &format!("{v:.6}"))
            }
            Some(TypeTag::Blob) => {
                let stack = self.stack();
                self.arena.push_i32(stack, TypeTag::String.to_byte() as i32)?;
                self.arena.blob_to_type(stack)
            }
            _ => Ok(()),
        }
    }

    /// Coerce the top payload item to blob.
    pub fn coerce_blob(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        self.arena.item_to_blob(stack)
    }

    /* CONTEXT TRANSFERS */

    /// `>`: copy the named context bundle onto the Stack.
    pub fn copy_context_bundle(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let name = self.require_string_top()?;
        let src = self.named_context(&name)?;
        self.arena.drop_elem(stack)?;
        self.arena.copy_bundle(src, stack)
    }

    /// `<<`: append the top of the Stack into the named context bundle.
    pub fn append_to_context_bundle(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let name = self.require_string_top()?;
        let dest = self.named_context(&name)?;
        self.arena.drop_elem(stack)?;
        self.arena.append_bundle(stack, dest)
    }

    /// `<`: replace the named context bundle with the top of the Stack.
    pub fn replace_context_bundle(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let name = self.require_string_top()?;
        let dest = self.named_context(&name)?;
        self.arena.drop_elem(stack)?;
        self.arena.replace_bundle(stack, dest)
    }

    /// `-`: move the top Stack element into the named context bundle.
    pub fn move_elem_to_context_bundle(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let name = self.require_string_top()?;
        let dest = self.named_context(&name)?;
        self.arena.drop_elem(stack)?;
        self.arena.move_elem(stack, dest)
    }

    /// Two-name form: `[dest-name, src-name]` on the stack.
    pub fn copy_bundle_by_name(&mut self) -> Result<(), VmError> {
        let (src, dest) = self.two_named_contexts()?;
        self.arena.copy_bundle(src, dest)
    }

    pub fn append_bundle_by_name(&mut self) -> Result<(), VmError> {
        let (src, dest) = self.two_named_contexts()?;
        self.arena.append_bundle(src, dest)
    }

    pub fn replace_bundle_by_name(&mut self) -> Result<(), VmError> {
        let (src, dest) = self.two_named_contexts()?;
        self.arena.replace_bundle(src, dest)
    }

    pub fn move_elem_by_name(&mut self) -> Result<(), VmError> {
        let (src, dest) = self.two_named_contexts()?;
        self.arena.move_elem(src, dest)
    }

    pub fn copy_elem_by_name(&mut self) -> Result<(), VmError> {
        let (src, dest) = self.two_named_contexts()?;
        self.arena.copy_elem(src, dest)
    }

    fn two_named_contexts(
        &mut self,
    ) -> Result<(crate::arena::Bundle, crate::arena::Bundle), VmError> {
        let stack = self.stack();
        let src_name = self.require_string_top()?;
        let src = self.named_context(&src_name)?;
        self.arena.drop_elem(stack)?;
        let dest_name = self.require_string_top()?;
        let dest = self.named_context(&dest_name)?;
        self.arena.drop_elem(stack)?;
        Ok((src, dest))
    }
}

/// Longest numeric prefix, `strtol`-style: optional sign, then digits;
/// no digits parse as zero.
fn parse_i32_prefix(s: &str) -> i32 {
    let s = s.trim_start();
    let mut end = 0;
    let bytes = s.as_bytes();
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    s[..end].parse().unwrap_or(0)
}

/// Longest float prefix, `strtof`-style.
fn parse_f32_prefix(s: &str) -> f32 {
    let s = s.trim_start();
    for end in (1..=s.len()).rev() {
        if let Ok(v) = s[..end].parse::<f32>() {
            return v;
        }
    }
    0.0
}
