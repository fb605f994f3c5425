//! Call and return via the Dump
//!
//! A call saves Input, Environment and Control onto the Dump as three
//! bundle elements, installs the body, and lets the evaluator drain it.
//! Return restores the three in reverse, leaving a copy of the callee's
//! environment on the Stack first.

use super::Vm;
use crate::arena::{ElemType, ALIGNED_PTR_SIZE};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::symtab;

impl Vm {
    /// Apply the top of the Stack.
    ///
    /// A bundle becomes the new program: Input, Environment and Control
    /// are saved to the Dump and the bundle's elements are queued in the
    /// Input. A message whose payload is an aligned-pointer blob invokes
    /// the native function; a blob that holds a bundle is unwrapped and
    /// applied. Everything else applies to itself and stays put.
    pub fn apply(&mut self) -> Result<(), VmError> {
        let input = self.input();
        let stack = self.stack();
        let env = self.env();
        let control = self.control();
        let dump = self.dump();

        self.arena.require_elems(stack, 1)?;
        loop {
            match self.arena.peek_elem_type(stack)? {
                ElemType::Bundle => {
                    tracing::debug!("applying a bundle body");
                    self.arena.copy_bundle(input, dump)?;
                    self.arena.clear_elems(input)?;

                    // queue the body in reverse so Input pops replay it
                    // in program order
                    let o = self.arena.last_elem_offset(stack)?;
                    let s = self.arena.elem_size(o)?;
                    let mut children = Vec::new();
                    let mut child = o + 4 + BUNDLE_HEADER_LEN;
                    while child < o + 4 + s {
                        let cs = self.arena.elem_size(child)?;
                        children.push(child);
                        child += cs + 4;
                    }
                    for &child in children.iter().rev() {
                        self.arena.copy_elem_at(child, input)?;
                    }
                    self.arena.drop_elem(stack)?;

                    self.arena.copy_bundle(env, dump)?;

                    if !self.arena.bundle_is_empty(control)? {
                        self.arena.drop_elem(control)?;
                    }
                    // once the body returns, adopt its environment
                    self.arena.push_string(control, "/</ee")?;
                    self.arena.copy_bundle(control, dump)?;
                    self.arena.clear_elems(control)?;
                    return Ok(());
                }
                ElemType::Message => {
                    let Some(tag) = self.arena.peek_item_tag(stack)? else {
                        return Ok(());
                    };
                    if tag != crate::tag::TypeTag::Blob {
                        // a scalar applies to itself
                        return Ok(());
                    }
                    let blob = self.arena.peek_blob(stack)?;
                    if blob.len() >= BUNDLE_ID_LEN && blob[..BUNDLE_ID_LEN] == BUNDLE_ID[..] {
                        self.arena.blob_to_elem(stack)?;
                        continue;
                    }
                    if blob.len() != ALIGNED_PTR_SIZE {
                        return Ok(());
                    }
                    let raw = self.arena.peek_aligned_ptr(stack)?;
                    if raw == 0 {
                        return Ok(());
                    }
                    self.arena.drop_elem(stack)?;
                    // Safety: the word was written by `lookup_in_env`
                    // from this process's own symbol table.
                    let f = unsafe { symtab::builtin_from_raw(raw) };
                    return f(self);
                }
            }
        }
    }

    /// Resolve the name on top of the Stack and apply it.
    pub fn funcall(&mut self) -> Result<(), VmError> {
        self.lookup_in_env()?;
        self.apply()
    }

    /// Restore Control, Environment and Input from the top three Dump
    /// elements, leaving a copy of the departing environment on the
    /// Stack.
    pub fn builtin_return(&mut self) -> Result<(), VmError> {
        let input = self.input();
        let stack = self.stack();
        let env = self.env();
        let control = self.control();
        let dump = self.dump();
        self.arena.require_elems(dump, 3)?;
        tracing::debug!("returning through a dump frame");

        self.arena.replace_bundle(dump, control)?;
        self.arena.copy_bundle(env, stack)?;
        self.arena.replace_bundle(dump, env)?;
        self.arena.replace_bundle(dump, input)
    }

    /// Execute the top stack element in the caller's environment.
    pub fn exec1(&mut self) -> Result<(), VmError> {
        self.exec_impl(false, false)
    }

    /// Execute the top stack element, replacing the environment with the
    /// next stack element.
    pub fn exec2(&mut self) -> Result<(), VmError> {
        self.exec_impl(true, false)
    }

    /// [`Vm::exec2`], additionally unpacking the remaining stack.
    pub fn exec3(&mut self) -> Result<(), VmError> {
        self.exec_impl(true, true)
    }

    /// The preferred entry point: replace-environment semantics.
    pub fn exec(&mut self) -> Result<(), VmError> {
        self.exec2()
    }

    fn exec_impl(&mut self, replace_env: bool, unpack_rest: bool) -> Result<(), VmError> {
        let input = self.input();
        let stack = self.stack();
        let env = self.env();
        let control = self.control();
        let dump = self.dump();

        self.arena.copy_bundle(input, dump)?;
        self.arena.clear_elems(input)?;
        self.arena.copy_bundle(env, dump)?;

        self.arena.move_elem(stack, input)?;
        if self.arena.peek_elem_type(input)? == ElemType::Bundle {
            self.arena.pop_all_drop(input)?;
        }
        if replace_env {
            self.arena.replace_bundle(stack, env)?;
        }
        if unpack_rest {
            self.arena.unpack_drop(stack)?;
        }

        if !self.arena.bundle_is_empty(control)? {
            self.arena.drop_elem(control)?;
        }
        self.arena.copy_bundle(control, dump)?;
        self.arena.clear_elems(control)
    }

    /// Conditional: `[else, then, cond]` keeps one branch and executes
    /// it with a copy of the current environment.
    pub fn builtin_if(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let env = self.env();
        let control = self.control();
        self.arena.push_i32(stack, 0)?;
        self.arena.neq(stack)?;
        self.arena.roll(stack)?;
        self.arena.drop_elem(stack)?;
        self.arena.copy_bundle(env, stack)?;
        self.arena.swap(stack)?;
        self.arena.push_string(control, "/!/exec")?;
        self.arena.swap(control)
    }

    /// `[body, n]`: execute the body `n` times.
    pub fn dotimes(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let control = self.control();
        let n = self.arena.pop_i32(stack)?;
        if n > 0 {
            self.arena.push_i32(control, n - 1)?;
            self.arena.copy_elem(stack, control)?;
            self.arena.push_string(control, "/!/drop")?;
            self.arena.push_string(control, "/!/exec1")?;
            self.arena.push_string(control, "/!/dotimes")?;
        } else {
            self.arena.drop_elem(stack)?;
        }
        Ok(())
    }

    /// `[args, f]`: apply `f` to each item of `args`, scheduling one
    /// application per step.
    pub fn map(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        let control = self.control();
        self.arena.require_elems(stack, 2)?;
        self.arena.swap(stack)?;
        if self.arena.peek_elem_type(stack)? == ElemType::Bundle {
            self.arena.count_items(stack)?;
            let n = self.arena.pop_i32(stack)?;
            self.arena.pop_all(stack)?;
            self.arena.push_bundle(stack)?;
            for _ in 0..n {
                self.arena.rot(stack)?;
                self.arena.count_items(stack)?;
                let items = self.arena.pop_i32(stack)?;
                if items == 0 {
                    for _ in 0..n + 3 {
                        self.arena.drop_elem(stack)?;
                    }
                    return Ok(());
                }
                self.arena.pop(stack)?;
                self.arena.notrot(stack)?;
                self.arena.push(stack)?;
                self.arena.notrot(stack)?;
                self.arena.push(stack)?;
                self.arena.swap(stack)?;
            }
            self.arena.copy_elem(stack, control)?;
            self.arena.drop_elem(stack)?;
            self.arena.swap(stack)?;
            self.arena.copy_elem(stack, control)?;
            self.arena.swap(control)?;
            self.arena.push_string(control, "/!/apply")?;
            self.arena.push_string(control, "/!/map")?;
            self.arena.push(stack)?;
            self.arena.unpack_drop(stack)
        } else {
            self.arena.count_items(stack)?;
            if self.arena.pop_i32(stack)? > 0 {
                self.arena.swap(stack)?;
                self.arena.copy_elem(stack, control)?;
                self.arena.swap(stack)?;
                self.arena.pop(stack)?;
                self.arena.swap(stack)?;
                self.arena.copy_elem(stack, control)?;
                self.arena.drop_elem(stack)?;
                self.arena.swap(stack)?;
                self.arena.push_string(control, "/!/apply")?;
                self.arena.push_string(control, "/!/map")?;
            }
            Ok(())
        }
    }

    /// Push the crate version.
    pub fn version(&mut self) -> Result<(), VmError> {
        let stack = self.stack();
        self.arena.push_string(stack, env!("CARGO_PKG_VERSION"))
    }
}

impl Vm {
    pub(crate) fn require_string_top(&self) -> Result<String, VmError> {
        let stack = self.stack();
        match self.arena.peek_item_tag(stack)? {
            Some(tag) if tag.is_string() => Ok(self.arena.peek_str(stack)?.to_owned()),
            _ => Err(Status::ItemType.into()),
        }
    }
}
