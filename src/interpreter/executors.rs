//! The fetch-decode-apply loop
//!
//! One iteration applies the topmost Control element, then drops the
//! topmost element. Builtins that schedule more work push it onto
//! Control with a sacrificial element on top, so the post-apply drop
//! consumes the sacrifice and leaves the schedule intact.

use super::Vm;
use crate::arena::ElemType;
use crate::consts::*;
use crate::error::{Status, VmError};

impl Vm {
    /// Dispatch the topmost Control element by its leading token.
    fn apply_control(&mut self) -> Result<(), VmError> {
        let control = self.control();
        let stack = self.stack();

        let is_literal = match self.arena.peek_elem_type(control)? {
            ElemType::Bundle => true,
            ElemType::Message => !matches!(
                self.arena.peek_item_tag(control)?,
                Some(tag) if tag.is_string()
            ),
        };
        if is_literal {
            return self.arena.copy_elem(control, stack);
        }

        let word = self.arena.peek_str(control)?.to_owned();
        tracing::trace!(%word, "dispatch");
        if let Some(rest) = strip_token(&word, "@") {
            let name = if rest.is_empty() { ANON_ADDRESS } else { rest };
            self.arena.push_string(stack, name)?;
            self.assign_stack_to_env()
        } else if let Some(rest) = strip_token(&word, "'") {
            self.arena.push_string(stack, rest)
        } else if let Some(rest) = strip_token(&word, "!") {
            self.arena.push_string(stack, rest)?;
            self.funcall()
        } else if let Some(rest) = strip_token(&word, "$") {
            self.arena.push_string(stack, rest)?;
            self.lookup_in_env()
        } else if let Some(rest) = strip_token(&word, ">") {
            self.arena.push_string(stack, rest)?;
            self.copy_context_bundle()
        } else if let Some(rest) = strip_token(&word, "<<") {
            self.arena.push_string(stack, rest)?;
            self.append_to_context_bundle()
        } else if let Some(rest) = strip_token(&word, "<") {
            self.arena.push_string(stack, rest)?;
            self.replace_context_bundle()
        } else if let Some(rest) = strip_token(&word, "-") {
            self.arena.push_string(stack, rest)?;
            self.move_elem_to_context_bundle()
        } else if let Some(rest) = strip_token(&word, "i") {
            if !rest.is_empty() {
                self.arena.push_string(stack, rest)?;
            }
            self.coerce_i32()
        } else if let Some(rest) = strip_token(&word, "f") {
            if !rest.is_empty() {
                self.arena.push_string(stack, rest)?;
            }
            self.coerce_f32()
        } else if let Some(rest) = strip_token(&word, "s") {
            if !rest.is_empty() {
                // the payload begins after the token's separator
                self.arena.push_string(stack, &rest[1..])?;
            }
            self.coerce_string()
        } else if let Some(rest) = strip_token(&word, "b") {
            if !rest.is_empty() {
                self.arena.push_string(stack, rest)?;
            }
            self.coerce_blob()
        } else if strip_token(&word, "#").is_some() {
            Ok(())
        } else {
            self.arena.push_string(stack, &word)
        }
    }

    /// Move one element from Input to Control and normalise it: a
    /// message that is not anonymous is exploded one element per payload
    /// item with its address re-queued as a string; nested bundles stay
    /// whole.
    fn pop_input_to_control(&mut self) -> Result<(), VmError> {
        let input = self.input();
        let control = self.control();
        self.arena.move_elem(input, control)?;
        if self.arena.bundle_is_empty(control)? {
            return Ok(());
        }
        if self.arena.peek_elem_type(control)? == ElemType::Bundle {
            return Ok(());
        }
        if self.arena.peek_address(control)? != ANON_ADDRESS {
            self.arena.push_string(control, ANON_ADDRESS)?;
            self.arena.push(control)?;
            self.arena.swap_string_to_address(control)?;
        }
        self.arena.count_items(control)?;
        let n = self.arena.pop_i32(control)?;
        for _ in 0..n {
            self.arena.pop(control)?;
            self.arena.swap(control)?;
        }
        self.arena.drop_elem(control)
    }

    /// Apply one Control element, or feed Control from Input, or return
    /// from the Dump. The status protocol runs between dispatches.
    /// Returns whether another step could make progress.
    pub fn step(&mut self) -> Result<bool, VmError> {
        let input = self.input();
        let control = self.control();
        let dump = self.dump();

        if !self.arena.bundle_is_empty(control)? {
            if let Err(e) = self.apply_control() {
                self.absorb_error(e)?;
            }
            if self.handle_status()? {
                return Ok(false);
            }
            if !self.arena.bundle_is_empty(control)? {
                self.arena.drop_elem(control)?;
            }
        } else if !self.arena.bundle_is_empty(input)? {
            if let Err(e) = self.pop_input_to_control() {
                self.absorb_error(e)?;
            }
        } else if !self.arena.bundle_is_empty(dump)? && !self.in_compile_mode() {
            self.builtin_return()?;
        } else {
            return Ok(false);
        }

        if !self.arena.bundle_is_empty(input)? || !self.arena.bundle_is_empty(control)? {
            return Ok(true);
        }
        if !self.arena.bundle_is_empty(dump)? {
            return Ok(!self.in_compile_mode());
        }
        Ok(false)
    }

    /// Drain Input through Control until the machine halts, returning
    /// through dump frames pushed during this run.
    pub fn run(&mut self) -> Result<(), VmError> {
        let input = self.input();
        let control = self.control();
        let dump = self.dump();
        let base_frames = self.arena.elem_count(dump)?;

        loop {
            loop {
                if self.arena.bundle_is_empty(control)? {
                    if self.arena.bundle_is_empty(input)? {
                        break;
                    }
                    if let Err(e) = self.pop_input_to_control() {
                        self.absorb_error(e)?;
                    }
                    if self.arena.bundle_is_empty(control)? {
                        continue;
                    }
                }
                while !self.arena.bundle_is_empty(control)? {
                    if let Err(e) = self.apply_control() {
                        self.absorb_error(e)?;
                    }
                    if self.handle_status()? {
                        return Ok(());
                    }
                    if !self.arena.bundle_is_empty(control)? {
                        self.arena.drop_elem(control)?;
                    }
                }
            }
            if !self.arena.bundle_is_empty(dump)?
                && self.arena.elem_count(dump)? > base_frames
                && !self.in_compile_mode()
            {
                self.builtin_return()?;
            } else {
                return Ok(());
            }
        }
    }

    /// The in-band error protocol: a non-zero status is cleared and
    /// pushed onto the Stack, and Control is redirected to the bound
    /// `/!/exception` handler. With no handler bound the machine halts,
    /// leaving the code on the stack; returns `true` in that case.
    fn handle_status(&mut self) -> Result<bool, VmError> {
        let status = self.arena.status();
        if status == Status::None {
            return Ok(false);
        }
        let stack = self.stack();
        let control = self.control();
        let env = self.env();
        self.arena.set_status(Status::None);
        self.arena.push_i32(stack, status.into())?;
        let bound = self.arena.find_by_address(env, "/exception")?.is_some()
            || self.symtab().lookup("/exception").is_some();
        if bound {
            self.arena.push_string(control, "/!/exception")?;
            // sacrificial element for the post-apply drop
            self.arena.push_string(control, ANON_ADDRESS)?;
            Ok(false)
        } else {
            tracing::debug!(%status, "no exception handler bound; halting");
            if !self.arena.bundle_is_empty(control)? {
                self.arena.drop_elem(control)?;
            }
            Ok(true)
        }
    }
}

/// Split `/X/rest` or exactly `/X` around the dispatch token `X`,
/// returning the rest with its leading separator (empty for the bare
/// form).
fn strip_token<'a>(word: &'a str, token: &str) -> Option<&'a str> {
    let tail = word.strip_prefix('/')?;
    let rest = tail.strip_prefix(token)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_stripping() {
        assert_eq!(strip_token("/@/name", "@"), Some("/name"));
        assert_eq!(strip_token("/@", "@"), Some(""));
        assert_eq!(strip_token("/<</ss", "<<"), Some("/ss"));
        assert_eq!(strip_token("/</ss", "<"), Some("/ss"));
        assert_eq!(strip_token("/<</ss", "<"), None);
        assert_eq!(strip_token("/x/y", "@"), None);
        assert_eq!(strip_token("/if", "i"), None);
        assert_eq!(strip_token("/i/5", "i"), Some("/5"));
        assert_eq!(strip_token("nope", "@"), None);
    }
}
