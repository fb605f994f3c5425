//! VM layout and construction

use super::Vm;
use crate::arena::{Arena, Bundle};
use crate::consts::*;
use crate::error::{Status, VmError};
use crate::stackops::Item;
use crate::symtab::SymbolTable;

/// Requested inner capacity for each VM sub-bundle, in bytes of free
/// space beyond the context overhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSizes {
    pub input: usize,
    pub stack: usize,
    pub env: usize,
    pub control: usize,
    pub dump: usize,
    pub output: usize,
}

impl ContextSizes {
    /// Split the available working space into six equal contexts.
    fn equal(avail: usize) -> Result<Self, VmError> {
        let per = (avail / 6).saturating_sub(CONTEXT_MESSAGE_OVERHEAD) & !3;
        if per < 4 {
            return Err(VmError::ArenaTooSmall(avail));
        }
        Ok(ContextSizes {
            input: per,
            stack: per,
            env: per,
            control: per,
            dump: per,
            output: per,
        })
    }
}

impl Vm {
    /// Partition the arena's working region into the seven VM contexts.
    pub fn init(arena: Arena) -> Result<Self, VmError> {
        let working = arena.working()?;
        let avail = arena.space_available(working)?;
        let sizes = ContextSizes::equal(avail.saturating_sub(CACHE_CONTEXT_SIZE))?;
        Self::with_sizes(arena, sizes)
    }

    /// Partition the arena's working region with caller-chosen context
    /// sizes.
    pub fn with_sizes(mut arena: Arena, sizes: ContextSizes) -> Result<Self, VmError> {
        let working = arena.working()?;
        arena.push_context(working, CACHE_CONTEXT_SIZE, ADDR_CACHE)?;
        let contexts = [
            (ADDR_INPUT, sizes.input),
            (ADDR_STACK, sizes.stack),
            (ADDR_ENV, sizes.env),
            (ADDR_CONTROL, sizes.control),
            (ADDR_DUMP, sizes.dump),
            (ADDR_OUTPUT, sizes.output),
        ];
        for (address, free) in contexts {
            if free % 4 != 0 {
                return Err(Status::Range.into());
            }
            arena.push_context(working, free + CONTEXT_MESSAGE_OVERHEAD, address)?;
        }

        let cache = arena.enter(working, ADDR_CACHE)?;
        let input = arena.enter(working, ADDR_INPUT)?;
        let stack = arena.enter(working, ADDR_STACK)?;
        let env = arena.enter(working, ADDR_ENV)?;
        let control = arena.enter(working, ADDR_CONTROL)?;
        let dump = arena.enter(working, ADDR_DUMP)?;
        let output = arena.enter(working, ADDR_OUTPUT)?;

        let mut slots = [0i32; CACHE_SLOTS];
        slots[0] = 7;
        slots[1] = 0; // flags
        for (slot, handle) in [input, stack, env, control, dump, output]
            .into_iter()
            .enumerate()
        {
            slots[2 + slot] = (handle.base() - working.base()) as i32;
        }
        let items: Vec<Item> = slots.iter().map(|&v| Item::I32(v)).collect();
        arena.push_message(cache, ANON_ADDRESS, &items)?;

        Ok(Vm {
            arena,
            input,
            stack,
            env,
            control,
            dump,
            output,
            cache,
            symtab: SymbolTable::default(),
        })
    }

    /// Reopen an arena that already carries a VM layout, decoding the
    /// handles from the cache message.
    pub fn attach(arena: Arena) -> Result<Self, VmError> {
        let working = arena.working()?;
        let cache = arena.enter(working, ADDR_CACHE)?;
        let elem = cache.base() + BUNDLE_HEADER_LEN;
        if arena.bundle_is_empty(cache)? {
            return Err(VmError::NotABundle(cache.base()));
        }
        let tt = elem + 4 + arena.padded_str_len(elem + 4)?;
        let payload = tt + arena.padded_str_len(tt)?;
        let mut handles = [Bundle(0); 6];
        for (slot, handle) in handles.iter_mut().enumerate() {
            let off = arena.read_i32(payload + 4 * (2 + slot))?;
            if off <= 0 {
                return Err(Status::Range.into());
            }
            *handle = Bundle(working.base() + off as usize);
            if !arena.is_bundle_at(handle.base()) {
                return Err(VmError::NotABundle(handle.base()));
            }
        }
        let [input, stack, env, control, dump, output] = handles;
        Ok(Vm {
            arena,
            input,
            stack,
            env,
            control,
            dump,
            output,
            cache,
            symtab: SymbolTable::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_lays_out_seven_contexts() {
        let vm = Vm::init(Arena::with_capacity(8192).unwrap()).unwrap();
        for b in [
            vm.input(),
            vm.stack(),
            vm.env(),
            vm.control(),
            vm.dump(),
            vm.output(),
        ] {
            assert!(vm.arena().is_bundle_at(b.base()));
            assert!(vm.arena().bundle_is_empty(b).unwrap());
        }
        // equal partition
        assert_eq!(
            vm.arena().bundle_total(vm.input()).unwrap(),
            vm.arena().bundle_total(vm.output()).unwrap()
        );
    }

    #[test]
    fn attach_recovers_handles_from_the_cache() {
        let mut vm = Vm::init(Arena::with_capacity(8192).unwrap()).unwrap();
        let stack = vm.stack();
        vm.arena_mut().push_i32(stack, 11).unwrap();
        let bytes = vm.arena().as_bytes().to_vec();

        let reopened = Vm::attach(Arena::from_bytes(bytes).unwrap()).unwrap();
        assert_eq!(reopened.stack(), stack);
        assert_eq!(reopened.arena().peek_i32(reopened.stack()).unwrap(), 11);
    }

    #[test]
    fn flags_live_in_the_cache() {
        let mut vm = Vm::init(Arena::with_capacity(8192).unwrap()).unwrap();
        assert!(!vm.in_compile_mode());
        vm.set_flags(super::super::FLAG_COMPILE).unwrap();
        assert!(vm.in_compile_mode());
        // flags survive a snapshot
        let bytes = vm.arena().as_bytes().to_vec();
        let reopened = Vm::attach(Arena::from_bytes(bytes).unwrap()).unwrap();
        assert!(reopened.in_compile_mode());
    }
}
