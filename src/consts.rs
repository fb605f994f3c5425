//! Wire and arena layout parameters

/// The 8-byte identifier that begins every encoded bundle.
pub const BUNDLE_ID: &[u8; 8] = b"#bundle\0";

/// Length of [`BUNDLE_ID`] in bytes.
pub const BUNDLE_ID_LEN: usize = 8;

/// Full bundle header: identifier followed by the (unused, zeroed)
/// 8-byte timetag slot.
pub const BUNDLE_HEADER_LEN: usize = 16;

/// The anonymous address is the empty string; encoded it still occupies
/// one padded word.
pub const ANON_ADDRESS: &str = "";

/// Encoded width of the anonymous address.
pub const ANON_ADDRESS_SIZE: usize = 4;

/// Encoded width of an empty typetag string (`,` plus padding).
pub const EMPTY_TYPETAG_STRING_SIZE: usize = 4;

/* CONTEXT MESSAGE LAYOUT */

/// Bytes of a context message not available to its inner bundle: element
/// size field, 3-character address, `,iiiibb` typetag string, four header
/// ints, the inner-bundle blob length field, the inner bundle header and
/// the trailing free blob length field.
pub const CONTEXT_MESSAGE_OVERHEAD: usize = 56;

/// Offset from a context message's size field to the `#bundle` header of
/// its inner bundle.
pub const CONTEXT_BUNDLE_OFFSET: usize = 36;

/// Context header fields addressed backwards from the inner bundle handle.
/// The blob length field that precedes the header doubles as the inner
/// bundle's size field.
pub const CONTEXT_BUNDLE_SIZE_OFFSET: isize = -4;
/// Total capacity in bytes of the inner bundle.
pub const CONTEXT_TOTAL_SIZE_OFFSET: isize = -8;
/// Distance from the parent bundle handle to this one.
pub const CONTEXT_PARENT_OFFSET: isize = -12;
/// Per-context status slot.
pub const CONTEXT_STATUS_OFFSET: isize = -16;

/// Inner free space reserved for the `/sx` status context.
pub const STATUS_CONTEXT_FREE: usize = 48;

/// Reserved 3-character context addresses.
pub const ADDR_STATUS: &str = "/sx";
/// The working region that holds the VM state.
pub const ADDR_WORKING: &str = "/cx";
/// VM sub-bundle addresses (laid out in the working region by `Vm::init`).
pub const ADDR_CACHE: &str = "/co";
pub const ADDR_INPUT: &str = "/ii";
pub const ADDR_STACK: &str = "/ss";
pub const ADDR_ENV: &str = "/ee";
pub const ADDR_CONTROL: &str = "/cc";
pub const ADDR_DUMP: &str = "/dd";
pub const ADDR_OUTPUT: &str = "/oo";

/// Context size reserved for the cache bookkeeping message.
pub const CACHE_CONTEXT_SIZE: usize = 216;

/// Number of int32 slots in the cache message.
pub const CACHE_SLOTS: usize = 30;

/// Smallest arena `Arena::with_capacity` accepts: root prefix and header,
/// the status context and a working context with one free word.
pub const MIN_ARENA_SIZE: usize = 4
    + BUNDLE_HEADER_LEN
    + CONTEXT_MESSAGE_OVERHEAD
    + STATUS_CONTEXT_FREE
    + CONTEXT_MESSAGE_OVERHEAD
    + 4;

/// Return `n` rounded up to a multiple of 4; `n == 0` maps to 4, so a
/// NUL terminator always fits.
pub const fn padded_len(n: usize) -> usize {
    (n + 4) & !3
}

/// Padding needed to bring a blob payload of `n` bytes to a word boundary.
pub const fn blob_padding(n: usize) -> usize {
    (4 - n % 4) % 4
}
