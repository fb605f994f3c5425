//! An embeddable virtual machine whose only data structure is an OSC
//! bundle.
//!
//! Programs and data share one representation: a self-describing tagged
//! bundle of messages inside a single contiguous arena. Computation is
//! the rewriting of that bundle under a control stream; the evaluator
//! repeatedly pops an operation from the Control sub-bundle and applies
//! it, mutating the Input, Stack, Environment, Control, Dump and Output
//! sub-bundles in place.

pub mod arena;
pub mod builtins;
pub mod consts;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod pattern;
pub mod slip;
pub mod stackops;
pub mod symtab;
pub mod tag;

pub mod prelude {
    pub use crate::arena::{Arena, Bundle, ElemType};
    pub use crate::error::{Status, VmError};
    pub use crate::interpreter::{ContextSizes, Vm};
    pub use crate::pattern::{match_pattern, Match, MatchResult};
    pub use crate::slip::{SlipDecoder, SlipEvent};
    pub use crate::stackops::Item;
    pub use crate::symtab::{BuiltinFn, SymbolTable};
    pub use crate::tag::TypeTag;
}
