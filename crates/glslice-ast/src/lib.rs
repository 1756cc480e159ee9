//! Typed syntax tree for the glslice shader partitioning compiler.
//!
//! The tree is the immutable input to a compile: arena-allocated tagged
//! nodes carrying canonical types and resolved symbols. The host-language
//! parser that produces it is an external collaborator; the
//! [`builder::ProgramBuilder`] constructs trees directly.

pub mod arena;
pub mod builder;
mod diag;
mod display;
mod expr;
pub mod names;
mod program;
mod stmt;
mod symbol;
pub mod types;

pub use arena::{Arena, Handle, UniqueArena};
pub use diag::{DiagKind, Diagnostic, Diagnostics, Severity};
pub use display::{dump_program, expr_to_string, stmt_to_string};
pub use expr::{
    BinaryOp, Callee, Expr, ExprKind, Literal, MathFunction, SwizzleComponent, SwizzlePattern,
    UnaryOp,
};
pub use program::{ProcDef, Program};
pub use stmt::{Block, Interpolation, Stmt};
pub use symbol::{BuiltinVar, GlobalClass, Symbol, SymbolKind};
pub use types::{
    glsl_type_name, is_sampler, scalar_of, Bytes, SamplerDim, Scalar, ScalarKind, StructMember,
    Type, TypeError, TypeInner, VectorSize,
};

/// A line/column position in the original host source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
