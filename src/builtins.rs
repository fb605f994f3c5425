//! Named builtin operations
//!
//! Thin wrappers giving every primitive the uniform `fn(&mut Vm)`
//! signature the symbol table stores. Most apply a stack primitive to
//! the Stack sub-bundle; the rest delegate to the evaluator.

use crate::error::VmError;
use crate::interpreter::Vm;
use crate::tag::{is_address_byte, TypeTag};

/// Apply an [`crate::arena::Arena`] primitive to the VM's Stack.
macro_rules! stack_builtins {
    ($($name:ident => $method:ident),* $(,)?) => {$(
        pub(crate) fn $name(vm: &mut Vm) -> Result<(), VmError> {
            let stack = vm.stack();
            vm.arena_mut().$method(stack)
        }
    )*};
}

stack_builtins! {
    two_drop => two_drop,
    two_dup => two_dup,
    two_over => two_over,
    two_swap => two_swap,
    drop => drop_elem,
    dup => dup,
    nip => nip,
    notrot => notrot,
    over => over,
    pick => pick,
    pick_bottom => pick_bottom,
    pick_match => pick_match,
    pick_pmatch => pick_pmatch,
    roll => roll,
    roll_bottom => roll_bottom,
    roll_match => roll_match,
    roll_pmatch => roll_pmatch,
    rot => rot,
    swap => swap,
    tuck => tuck,

    bundle_all => bundle_all,
    bundle_from_bottom => bundle_from_bottom,
    bundle_from_top => bundle_from_top,
    clear => clear_elems,
    join => join,
    pop => pop,
    pop_all => pop_all,
    pop_all_bundle => pop_all_bundle,
    pop_all_drop => pop_all_drop,
    pop_all_drop_bundle => pop_all_drop_bundle,
    push => push,
    split => split,
    unpack => unpack,
    unpack_drop => unpack_drop,

    count_elems => count_elems,
    count_items => count_items,
    length_item => length_item,
    size_elem => size_elem,
    size_item => size_item,
    size_tt => size_tt,
    get_addresses => get_addresses,

    blob_to_elem => blob_to_elem,
    blob_to_type => blob_to_type,
    concatenate_blobs => concatenate_blobs,
    concatenate_strings => concatenate_strings,
    copy_address_to_string => copy_address_to_string,
    decatenate_blob_from_end => decatenate_blob_from_end,
    decatenate_blob_from_start => decatenate_blob_from_start,
    decatenate_string_from_end => decatenate_string_from_end,
    decatenate_string_from_start => decatenate_string_from_start,
    elem_to_blob => elem_to_blob,
    item_to_blob => item_to_blob,
    join_strings => join_strings,
    move_string_to_address => move_string_to_address,
    swap_string_to_address => swap_string_to_address,
    split_string_from_end => split_string_from_end,
    split_string_from_start => split_string_from_start,
    swap_4_bytes => swap_4_bytes,
    swap_8_bytes => swap_8_bytes,
    swap_n_bytes => swap_n_bytes,
    trim_string_end => trim_string_end,
    trim_string_start => trim_string_start,

    match_strings => match_strings,
    pmatch => pmatch,
    route => route,
    route_with_delegation => route_with_delegation,
    gather => gather,
    nth => nth,

    replace => replace,
    assign => assign,
    lookup => lookup,

    make_blob => make_blob,
    push_bundle => push_bundle,

    add => add,
    sub => sub,
    mul => mul,
    div => div,
    rem => rem,
    pow => pow,
    neg => neg,
    eql => eql,
    neq => neq,
    lte => lte,
    lt => lt,
    and => and,
    or => or,
}

/// Test the int32 on top against a type-tag predicate, pushing 0/1.
macro_rules! predicate_builtins {
    ($($name:ident => $test:expr),* $(,)?) => {$(
        pub(crate) fn $name(vm: &mut Vm) -> Result<(), VmError> {
            let stack = vm.stack();
            let c = vm.arena_mut().pop_i32(stack)?;
            let test: fn(u8) -> bool = $test;
            vm.arena_mut().push_i32(stack, test(c as u8) as i32)
        }
    )*};
}

predicate_builtins! {
    is_address_char => is_address_byte,
    is_known_typetag => |c| TypeTag::from_byte(c).is_ok(),
    is_string_type => |c| TypeTag::from_byte(c).map(TypeTag::is_string).unwrap_or(false),
    is_integer_type => |c| TypeTag::from_byte(c).map(TypeTag::is_integer).unwrap_or(false),
    is_float_type => |c| TypeTag::from_byte(c).map(TypeTag::is_float).unwrap_or(false),
    is_numeric_type => |c| TypeTag::from_byte(c).map(TypeTag::is_numeric).unwrap_or(false),
    is_unit_type => |c| TypeTag::from_byte(c).map(TypeTag::is_unit).unwrap_or(false),
    is_bool_type => |c| TypeTag::from_byte(c).map(TypeTag::is_bool).unwrap_or(false),
}

/// Delegate to an evaluator method.
macro_rules! vm_builtins {
    ($($name:ident => $method:ident),* $(,)?) => {$(
        pub(crate) fn $name(vm: &mut Vm) -> Result<(), VmError> {
            vm.$method()
        }
    )*};
}

vm_builtins! {
    apply => apply,
    funcall => funcall,
    vm_return => builtin_return,
    exec => exec,
    exec1 => exec1,
    exec2 => exec2,
    exec3 => exec3,
    vm_if => builtin_if,
    dotimes => dotimes,
    map => map,
    version => version,
    assign_stack_to_env => assign_stack_to_env,
    lookup_in_env => lookup_in_env,
    to_int32 => coerce_i32,
    to_float => coerce_f32,
    to_string => coerce_string,
    to_blob => coerce_blob,
    copy_context_bundle => copy_context_bundle,
    append_to_context_bundle => append_to_context_bundle,
    replace_context_bundle => replace_context_bundle,
    move_elem_to_context_bundle => move_elem_to_context_bundle,
    copy_bundle_by_name => copy_bundle_by_name,
    append_bundle_by_name => append_bundle_by_name,
    replace_bundle_by_name => replace_bundle_by_name,
    move_elem_by_name => move_elem_by_name,
    copy_elem_by_name => copy_elem_by_name,
}

/// The quote operation leaves its argument alone.
pub(crate) fn quote(_vm: &mut Vm) -> Result<(), VmError> {
    Ok(())
}

/// Operations whose semantics the source design leaves undefined.
macro_rules! unimplemented_builtins {
    ($($name:ident => $symbol:literal),* $(,)?) => {$(
        pub(crate) fn $name(_vm: &mut Vm) -> Result<(), VmError> {
            Err(VmError::NotImplemented($symbol))
        }
    )*};
}

unimplemented_builtins! {
    clear_payload => "/clear/payload",
    length_address => "/length/address",
    length_tt => "/length/tt",
    select => "/select",
    select_with_delegation => "/select/all",
}
