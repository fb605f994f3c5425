//! [`Vm`] implementation
//!
//! The VM state is seven context messages laid out inside the arena's
//! working region: the cache bookkeeping message plus Input, Stack,
//! Environment, Control, Dump and Output. The struct itself only carries
//! the decoded handles and the symbol table; everything else, flags
//! included, lives in the arena so a byte-copy snapshot is complete.

use crate::arena::{Arena, Bundle};
use crate::consts::*;
use crate::error::VmError;
use crate::symtab::SymbolTable;

mod executors;
mod flow;
mod initialization;
mod internal;

pub use initialization::ContextSizes;

/// Bit set in the cache flags slot while a quoted program body is being
/// collected; suppresses dump restoration.
pub(crate) const FLAG_COMPILE: i32 = 0x1;

/// The OSC bundle virtual machine.
#[derive(Debug)]
pub struct Vm {
    pub(crate) arena: Arena,
    input: Bundle,
    stack: Bundle,
    env: Bundle,
    control: Bundle,
    dump: Bundle,
    output: Bundle,
    cache: Bundle,
    symtab: SymbolTable,
}

impl Vm {
    /// The arena, for inspection and snapshotting.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Symbol table used to resolve `/!/name` addresses.
    pub fn symtab(&self) -> &SymbolTable {
        &self.symtab
    }

    pub fn symtab_mut(&mut self) -> &mut SymbolTable {
        &mut self.symtab
    }

    pub fn input(&self) -> Bundle {
        self.input
    }

    pub fn stack(&self) -> Bundle {
        self.stack
    }

    pub fn env(&self) -> Bundle {
        self.env
    }

    pub fn control(&self) -> Bundle {
        self.control
    }

    pub fn dump(&self) -> Bundle {
        self.dump
    }

    pub fn output(&self) -> Bundle {
        self.output
    }

    /* FLAGS */

    fn flags_slot(&self) -> Result<usize, VmError> {
        // second int32 of the cache message
        let elem = self.cache.base() + BUNDLE_HEADER_LEN;
        let tt = elem + 4 + self.arena.padded_str_len(elem + 4)?;
        let payload = tt + self.arena.padded_str_len(tt)?;
        Ok(payload + 4)
    }

    pub(crate) fn flags(&self) -> Result<i32, VmError> {
        let slot = self.flags_slot()?;
        self.arena.read_i32(slot)
    }

    pub(crate) fn set_flags(&mut self, flags: i32) -> Result<(), VmError> {
        let slot = self.flags_slot()?;
        self.arena.write_i32(slot, flags)
    }

    /// True while collecting a quoted program body.
    pub fn in_compile_mode(&self) -> bool {
        self.flags().map(|f| f & FLAG_COMPILE != 0).unwrap_or(false)
    }

    /// Enter or leave compile mode, as a host macro layer's `(` and `)`
    /// would.
    pub fn set_compile_mode(&mut self, on: bool) -> Result<(), VmError> {
        let flags = self.flags()?;
        let flags = if on {
            flags | FLAG_COMPILE
        } else {
            flags & !FLAG_COMPILE
        };
        self.set_flags(flags)
    }

    /* HOST INPUT AND OUTPUT */

    /// Write one encoded message into the Input sub-bundle.
    pub fn input_message(&mut self, message: &[u8]) -> Result<(), VmError> {
        let input = self.input;
        self.arena.push_blob(input, message)?;
        self.arena.blob_to_elem(input)
    }

    /// Write an encoded bundle into the Input sub-bundle, splitting it
    /// into individual elements.
    pub fn input_messages(&mut self, bundle: &[u8]) -> Result<(), VmError> {
        let input = self.input;
        self.arena.push_blob(input, bundle)?;
        self.arena.blob_to_elem(input)?;
        self.arena.pop_all_drop(input)
    }

    /// The encoded elements currently in the Output sub-bundle.
    pub fn output_bytes(&self) -> Result<&[u8], VmError> {
        let size = self.arena.bundle_size(self.output)?;
        Ok(self
            .arena
            .bytes(self.output.base() + BUNDLE_HEADER_LEN..self.output.base() + size))
    }

    /// Take the Output contents, leaving it empty.
    pub fn take_output(&mut self) -> Result<Vec<u8>, VmError> {
        let bytes = self.output_bytes()?.to_vec();
        let output = self.output;
        self.arena.clear_elems(output)?;
        Ok(bytes)
    }

    /* STATUS */

    /// Record a recoverable error in the status slot; fatal errors
    /// propagate.
    pub(crate) fn absorb_error(&mut self, err: VmError) -> Result<(), VmError> {
        match err.status() {
            Some(status) => {
                tracing::debug!(%status, "primitive reported a recoverable error");
                self.arena.set_status(status);
                Ok(())
            }
            None => Err(err),
        }
    }

    /// Resolve a named context to its sub-bundle handle.
    pub(crate) fn named_context(&self, address: &str) -> Result<Bundle, VmError> {
        match address {
            ADDR_INPUT => Ok(self.input),
            ADDR_STACK => Ok(self.stack),
            ADDR_ENV => Ok(self.env),
            ADDR_CONTROL => Ok(self.control),
            ADDR_DUMP => Ok(self.dump),
            ADDR_OUTPUT => Ok(self.output),
            _ => {
                let working = self.arena.working()?;
                self.arena.enter(working, address)
            }
        }
    }
}

impl TryFrom<Arena> for Vm {
    type Error = VmError;

    /// Reopen an arena that already carries a VM layout.
    fn try_from(arena: Arena) -> Result<Self, VmError> {
        Vm::attach(arena)
    }
}
