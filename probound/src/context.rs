//! Central compilation data structure.
use partial_ref::{part, PartialRefTarget};

use crate::build::ExpressionCache;
use crate::class::ClassRegistry;
use crate::lower::AuxAllocator;
use crate::rules::RuleSet;
use crate::state::CompileState;

/// Part declarations for the [`Context`] struct.
mod parts {
    use super::*;

    part!(pub AuxAllocP: AuxAllocator);
    part!(pub ClassesP: ClassRegistry);
    part!(pub CompileStateP: CompileState);
    part!(pub ExpressionsP: ExpressionCache);
    part!(pub RulesP: RuleSet);
}

pub use parts::*;

/// Central compilation data structure.
///
/// This struct contains all state kept across the compilation pipeline. Most
/// functions operating on multiple fields of the context use partial
/// references provided by the `partial_ref` crate. This documents the data
/// dependencies and makes the borrow checker happy without the overhead of
/// passing individual references.
#[derive(PartialRefTarget, Default)]
pub struct Context {
    #[part = "AuxAllocP"]
    aux_alloc: AuxAllocator,
    #[part = "ClassesP"]
    classes: ClassRegistry,
    #[part = "CompileStateP"]
    compile_state: CompileState,
    #[part = "ExpressionsP"]
    expressions: ExpressionCache,
    #[part = "RulesP"]
    rules: RuleSet,
}
