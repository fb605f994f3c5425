//! Runtime error implementation
//!
//! Two layers, mirroring the recoverable/halt split: [`Status`] values are
//! the in-band error codes a primitive may leave in the `/sx` status slot,
//! and [`VmError`] wraps them together with the fatal conditions that
//! indicate caller error rather than a recoverable state.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Recoverable error kinds, stored as an int32 in the `/sx` status slot.
///
/// Primitives never abort on these; they return the code and leave the
/// bundle in its pre-call shape whenever feasible. The evaluator observes
/// the slot between dispatches.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Error, IntoPrimitive, TryFromPrimitive,
)]
#[repr(i32)]
pub enum Status {
    /// No error.
    #[error("no error")]
    None = 0,
    /// An element had the wrong shape (message where a bundle was needed,
    /// or the reverse).
    #[error("wrong element type")]
    ElemType = 1,
    /// A payload item had the wrong type tag.
    #[error("wrong item type")]
    ItemType = 2,
    /// The bundle held fewer elements than the operation consumes.
    #[error("too few elements")]
    ElemCount = 3,
    /// A message held fewer payload items than the operation consumes.
    #[error("too few items")]
    ItemCount = 4,
    /// An offset or size fell outside its container.
    #[error("offset out of range")]
    Range = 5,
    /// A type tag outside the supported set.
    #[error("unknown typetag")]
    UnknownTypetag = 6,
}

/// Errors surfaced by the arena, the primitives and the evaluator.
#[derive(Debug, Error)]
pub enum VmError {
    /// A recoverable condition; the evaluator turns these into the status
    /// slot protocol instead of propagating.
    #[error("recoverable error: {0}")]
    Status(#[from] Status),
    /// The operation exists in the symbol table but its semantics are
    /// deliberately left undefined.
    #[error("operation is not implemented: {0}")]
    NotImplemented(&'static str),
    /// The provided arena cannot hold the initial layout.
    #[error("arena of {0} bytes is too small")]
    ArenaTooSmall(usize),
    /// A location claimed to hold a bundle does not begin with `#bundle`.
    #[error("no bundle header at offset {0}")]
    NotABundle(usize),
    /// `enter` was asked for a context address that was never pushed.
    #[error("unknown context address {0:?}")]
    UnknownContext(String),
}

impl VmError {
    /// The recoverable status behind this error, if any.
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Status(s) => Some(*s),
            _ => None,
        }
    }

    /// True when the evaluator should convert this error into the in-band
    /// status protocol rather than halt.
    pub const fn is_recoverable(&self) -> bool {
        self.status().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_wire_values() {
        assert_eq!(i32::from(Status::None), 0);
        assert_eq!(i32::from(Status::ItemType), 2);
        assert_eq!(i32::from(Status::UnknownTypetag), 6);
        assert!(matches!(Status::try_from(5), Ok(Status::Range)));
        assert!(Status::try_from(7).is_err());
    }

    #[test]
    fn only_status_errors_are_recoverable() {
        assert!(VmError::from(Status::ElemCount).is_recoverable());
        assert!(!VmError::NotImplemented("/select").is_recoverable());
    }
}
