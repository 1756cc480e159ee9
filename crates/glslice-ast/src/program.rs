//! The program container: arenas plus the pipeline body.

use crate::arena::{Arena, Handle, UniqueArena};
use crate::expr::Expr;
use crate::stmt::Block;
use crate::symbol::Symbol;
use crate::types::Type;

/// A user-defined procedure invoked from shader bodies.
#[derive(Clone, Debug)]
pub struct ProcDef {
    /// The procedure's own symbol.
    pub sym: Handle<Symbol>,
    /// Formal parameters, in declaration order.
    pub params: Vec<Handle<Symbol>>,
    /// Return type; `None` for void procedures.
    pub result: Option<Handle<Type>>,
    /// The procedure body.
    pub body: Block,
}

/// A unified pipeline program: the immutable input to a compile.
///
/// All tree nodes live in arenas and reference each other by handle; the
/// top-level `body` is the statement list the partitioner classifies.
#[derive(Clone, Debug, Default)]
pub struct Program {
    /// Deduplicated type arena.
    pub types: UniqueArena<Type>,
    /// Every resolved symbol in the program.
    pub symbols: Arena<Symbol>,
    /// User-defined procedures.
    pub procs: Arena<ProcDef>,
    /// Expression arena.
    pub exprs: Arena<Expr>,
    /// The unified pipeline body, straight-line at top level.
    pub body: Block,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprKind, Literal};
    use crate::types::{Scalar, TypeInner};

    #[test]
    fn empty_program() {
        let p = Program::default();
        assert!(p.body.is_empty());
        assert!(p.exprs.is_empty());
        assert!(p.symbols.is_empty());
    }

    #[test]
    fn arena_wiring() {
        let mut p = Program::default();
        let f32_ty = p.types.insert(Type {
            name: None,
            inner: TypeInner::Scalar(Scalar::F32),
        });
        let lit = p.exprs.append(Expr {
            kind: ExprKind::Literal(Literal::F32(0.5)),
            ty: f32_ty,
            loc: None,
        });
        assert_eq!(p.exprs[lit].ty, f32_ty);
        assert_eq!(p.exprs.len(), 1);
    }
}
