//! Builtin symbol table
//!
//! A static, sorted name table resolved by binary search, with per-VM
//! host registrations consulted first. Resolved entries are pushed onto
//! the Stack as aligned-pointer blobs and invoked by `Vm::apply`.

use crate::builtins;
use crate::error::VmError;
use crate::interpreter::Vm;

/// Signature shared by every builtin and host-registered function.
pub type BuiltinFn = fn(&mut Vm) -> Result<(), VmError>;

/// Reconstitute a function pointer read back from an aligned-pointer
/// blob.
///
/// # Safety
///
/// `raw` must be a value previously produced from a [`BuiltinFn`] in
/// this process; the blobs are never persisted or relocated.
pub(crate) unsafe fn builtin_from_raw(raw: usize) -> BuiltinFn {
    core::mem::transmute::<usize, BuiltinFn>(raw)
}

/// Name to builtin mapping, host entries first.
#[derive(Debug, Default)]
pub struct SymbolTable {
    user: Vec<(String, BuiltinFn)>,
}

impl SymbolTable {
    /// Resolve a symbol name.
    pub fn lookup(&self, name: &str) -> Option<BuiltinFn> {
        if let Some((_, f)) = self.user.iter().rev().find(|(n, _)| n.as_str() == name) {
            return Some(*f);
        }
        BUILTINS
            .binary_search_by_key(&name, |&(n, _)| n)
            .ok()
            .map(|i| BUILTINS[i].1)
    }

    /// Register a host function; later registrations shadow earlier ones
    /// and the builtins.
    pub fn register(&mut self, name: impl Into<String>, f: BuiltinFn) {
        self.user.push((name.into(), f));
    }

    /// All builtin names, in sorted order.
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTINS.iter().map(|(n, _)| *n)
    }
}

/// The builtin set, sorted by name for binary search.
static BUILTINS: &[(&str, BuiltinFn)] = &[
    ("/!", builtins::funcall),
    ("/$", builtins::lookup_in_env),
    ("/'", builtins::quote),
    ("/-", builtins::move_elem_to_context_bundle),
    ("/-rot", builtins::notrot),
    ("/2drop", builtins::two_drop),
    ("/2dup", builtins::two_dup),
    ("/2over", builtins::two_over),
    ("/2swap", builtins::two_swap),
    ("/<", builtins::replace_context_bundle),
    ("/<<", builtins::append_to_context_bundle),
    ("/>", builtins::copy_context_bundle),
    ("/@", builtins::assign_stack_to_env),
    ("/add", builtins::add),
    ("/address", builtins::copy_address_to_string),
    ("/addresses", builtins::get_addresses),
    ("/and", builtins::and),
    ("/append/bundle", builtins::append_bundle_by_name),
    ("/appendtocontextbundle", builtins::append_to_context_bundle),
    ("/apply", builtins::apply),
    ("/assign", builtins::assign),
    ("/assignstacktoenv", builtins::assign_stack_to_env),
    ("/b", builtins::to_blob),
    ("/blob/toelem", builtins::blob_to_elem),
    ("/blob/totype", builtins::blob_to_type),
    ("/bundle/all", builtins::bundle_all),
    ("/bundle/frombottom", builtins::bundle_from_bottom),
    ("/bundle/fromtop", builtins::bundle_from_top),
    ("/clear", builtins::clear),
    ("/clear/payload", builtins::clear_payload),
    ("/concat/blobs", builtins::concatenate_blobs),
    ("/concat/strings", builtins::concatenate_strings),
    ("/copy/bundle", builtins::copy_bundle_by_name),
    ("/copy/elem", builtins::copy_elem_by_name),
    ("/copycontextbundle", builtins::copy_context_bundle),
    ("/count/elems", builtins::count_elems),
    ("/count/items", builtins::count_items),
    ("/decat/blob/fromend", builtins::decatenate_blob_from_end),
    ("/decat/blob/fromstart", builtins::decatenate_blob_from_start),
    ("/decat/string/fromend", builtins::decatenate_string_from_end),
    ("/decat/string/fromstart", builtins::decatenate_string_from_start),
    ("/div", builtins::div),
    ("/dotimes", builtins::dotimes),
    ("/drop", builtins::drop),
    ("/dup", builtins::dup),
    ("/elem/toblob", builtins::elem_to_blob),
    ("/eql", builtins::eql),
    ("/exec", builtins::exec),
    ("/exec1", builtins::exec1),
    ("/exec2", builtins::exec2),
    ("/exec3", builtins::exec3),
    ("/f", builtins::to_float),
    ("/funcall", builtins::funcall),
    ("/gather", builtins::gather),
    ("/i", builtins::to_int32),
    ("/if", builtins::vm_if),
    ("/is/addresschar", builtins::is_address_char),
    ("/is/type/bool", builtins::is_bool_type),
    ("/is/type/float", builtins::is_float_type),
    ("/is/type/int", builtins::is_integer_type),
    ("/is/type/known", builtins::is_known_typetag),
    ("/is/type/numeric", builtins::is_numeric_type),
    ("/is/type/string", builtins::is_string_type),
    ("/is/type/unit", builtins::is_unit_type),
    ("/item/toblob", builtins::item_to_blob),
    ("/join", builtins::join),
    ("/join/strings", builtins::join_strings),
    ("/length/address", builtins::length_address),
    ("/length/item", builtins::length_item),
    ("/length/tt", builtins::length_tt),
    ("/lookup", builtins::lookup),
    ("/lookupinenv", builtins::lookup_in_env),
    ("/lt", builtins::lt),
    ("/lte", builtins::lte),
    ("/make/bundle", builtins::push_bundle),
    ("/map", builtins::map),
    ("/match", builtins::match_strings),
    ("/mod", builtins::rem),
    ("/move/elem", builtins::move_elem_by_name),
    ("/moveelemtocontextbundle", builtins::move_elem_to_context_bundle),
    ("/mul", builtins::mul),
    ("/neg", builtins::neg),
    ("/neq", builtins::neq),
    ("/nip", builtins::nip),
    ("/nth", builtins::nth),
    ("/or", builtins::or),
    ("/over", builtins::over),
    ("/pick/bottom", builtins::pick_bottom),
    ("/pick/jth", builtins::pick),
    ("/pick/match", builtins::pick_match),
    ("/pick/pmatch", builtins::pick_pmatch),
    ("/pmatch", builtins::pmatch),
    ("/pop", builtins::pop),
    ("/pop/all", builtins::pop_all),
    ("/pop/all/bundle", builtins::pop_all_bundle),
    ("/pop/all/drop", builtins::pop_all_drop),
    ("/pop/all/drop/bundle", builtins::pop_all_drop_bundle),
    ("/pow", builtins::pow),
    ("/push", builtins::push),
    ("/push/blob", builtins::make_blob),
    ("/quote", builtins::quote),
    ("/replace", builtins::replace),
    ("/replace/bundle", builtins::replace_bundle_by_name),
    ("/replacecontextbundle", builtins::replace_context_bundle),
    ("/return", builtins::vm_return),
    ("/roll/bottom", builtins::roll_bottom),
    ("/roll/jth", builtins::roll),
    ("/roll/match", builtins::roll_match),
    ("/roll/pmatch", builtins::roll_pmatch),
    ("/rot", builtins::rot),
    ("/route", builtins::route),
    ("/route/all", builtins::route_with_delegation),
    ("/s", builtins::to_string),
    ("/select", builtins::select),
    ("/select/all", builtins::select_with_delegation),
    ("/size/elem", builtins::size_elem),
    ("/size/item", builtins::size_item),
    ("/size/tt", builtins::size_tt),
    ("/split", builtins::split),
    ("/split/string/fromend", builtins::split_string_from_end),
    ("/split/string/fromstart", builtins::split_string_from_start),
    ("/string/toaddress/move", builtins::move_string_to_address),
    ("/string/toaddress/swap", builtins::swap_string_to_address),
    ("/sub", builtins::sub),
    ("/swap", builtins::swap),
    ("/swap/bytes/4", builtins::swap_4_bytes),
    ("/swap/bytes/8", builtins::swap_8_bytes),
    ("/swap/bytes/n", builtins::swap_n_bytes),
    ("/toblob", builtins::to_blob),
    ("/tofloat", builtins::to_float),
    ("/toint32", builtins::to_int32),
    ("/tostring", builtins::to_string),
    ("/trim/string/end", builtins::trim_string_end),
    ("/trim/string/start", builtins::trim_string_start),
    ("/tuck", builtins::tuck),
    ("/unpack", builtins::unpack),
    ("/unpack/drop", builtins::unpack_drop),
    ("/version", builtins::version),
];
