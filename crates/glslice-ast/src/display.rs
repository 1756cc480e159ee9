//! Display implementations and a text dump for debugging.

use std::fmt;

use crate::arena::Handle;
use crate::expr::{BinaryOp, Callee, Expr, ExprKind, Literal, UnaryOp};
use crate::program::Program;
use crate::stmt::{Interpolation, Stmt};
use crate::symbol::{GlobalClass, SymbolKind};
use crate::types::describe;

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negate => "-",
            Self::LogicalNot => "!",
            Self::BitwiseNot => "~",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::BitwiseAnd => "&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
        })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}u"),
            Self::F32(v) => {
                if v.fract() == 0.0 && v.is_finite() && v.abs() < 1e15 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_keyword())
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Param => "param",
            Self::Local => "local",
            Self::Result => "result",
            Self::Global => "global",
            Self::ModuleConst => "const",
            Self::Proc => "proc",
            Self::Field => "field",
        })
    }
}

/// Renders one expression as source-like text.
pub fn expr_to_string(program: &Program, handle: Handle<Expr>) -> String {
    let mut out = String::new();
    write_expr(program, handle, &mut out);
    out
}

fn write_expr(program: &Program, handle: Handle<Expr>, out: &mut String) {
    match &program.exprs[handle].kind {
        ExprKind::Literal(lit) => out.push_str(&lit.to_string()),
        ExprKind::SymbolRef(sym) => out.push_str(&program.symbols[*sym].name),
        ExprKind::Member { base, field } => {
            write_expr(program, *base, out);
            out.push('.');
            out.push_str(&program.symbols[*field].name);
        }
        ExprKind::Swizzle { base, pattern } => {
            write_expr(program, *base, out);
            out.push('.');
            out.push_str(&pattern.glsl_postfix());
        }
        ExprKind::Index { base, index } => {
            write_expr(program, *base, out);
            out.push('[');
            write_expr(program, *index, out);
            out.push(']');
        }
        ExprKind::Unary { op, expr } => {
            out.push_str(&op.to_string());
            write_expr(program, *expr, out);
        }
        ExprKind::Binary { op, left, right } => {
            out.push('(');
            write_expr(program, *left, out);
            out.push_str(&format!(" {op} "));
            write_expr(program, *right, out);
            out.push(')');
        }
        ExprKind::Select {
            condition,
            accept,
            reject,
        } => {
            out.push('(');
            write_expr(program, *condition, out);
            out.push_str(" ? ");
            write_expr(program, *accept, out);
            out.push_str(" : ");
            write_expr(program, *reject, out);
            out.push(')');
        }
        ExprKind::Call { callee, args } => {
            match callee {
                Callee::Proc(p) => out.push_str(&program.symbols[program.procs[*p].sym].name),
                Callee::Math(m) => out.push_str(m.glsl_name()),
                Callee::Texture => out.push_str("texture"),
                Callee::Construct(ty) => out.push_str(&describe(&program.types, *ty)),
            }
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(program, *arg, out);
            }
            out.push(')');
        }
    }
}

/// Renders one statement as a single source-like line.
pub fn stmt_to_string(program: &Program, stmt: &Stmt) -> String {
    match stmt {
        Stmt::Assign { lhs, op, rhs } => {
            let lhs = expr_to_string(program, *lhs);
            let rhs = expr_to_string(program, *rhs);
            match op {
                Some(op) => format!("{lhs} {op}= {rhs}"),
                None => format!("{lhs} = {rhs}"),
            }
        }
        Stmt::Local { var, init } => {
            let name = &program.symbols[*var].name;
            match init {
                Some(e) => format!("let {name} = {}", expr_to_string(program, *e)),
                None => format!("var {name}"),
            }
        }
        Stmt::If { condition, .. } => {
            format!("if {}: ...", expr_to_string(program, *condition))
        }
        Stmt::ForRange {
            var, start, end, ..
        } => format!(
            "for {} in {} ..< {}: ...",
            program.symbols[*var].name,
            expr_to_string(program, *start),
            expr_to_string(program, *end)
        ),
        Stmt::ForEach { var, array, .. } => format!(
            "for {} in items({}): ...",
            program.symbols[*var].name,
            expr_to_string(program, *array)
        ),
        Stmt::While { condition, .. } => {
            format!("while {}: ...", expr_to_string(program, *condition))
        }
        Stmt::Return { value } => match value {
            Some(e) => format!("return {}", expr_to_string(program, *e)),
            None => "return".to_string(),
        },
        Stmt::Expr(e) => expr_to_string(program, *e),
        Stmt::Interpolate { target, qualifier } => match qualifier {
            Some(q) => format!("interpolate({}, {q})", expr_to_string(program, *target)),
            None => format!("interpolate({})", expr_to_string(program, *target)),
        },
    }
}

/// Dumps a whole program as text, for debugging and `--emit-plan` output.
pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();

    out.push_str("Globals:\n");
    for (_, sym) in program.symbols.iter() {
        let role = match sym.class {
            Some(GlobalClass::ModuleConst) => "const",
            Some(GlobalClass::CpuDynamic) => "uniform",
            Some(GlobalClass::Attribute { .. }) => "attribute",
            Some(GlobalClass::Sampler) => "sampler",
            Some(GlobalClass::FragOutput { .. }) => "output",
            Some(GlobalClass::Builtin(_)) => "builtin",
            None => continue,
        };
        out.push_str(&format!(
            "  {role} {}: {}\n",
            sym.name,
            describe(&program.types, sym.ty)
        ));
    }

    out.push_str("Body:\n");
    for (i, stmt) in program.body.iter().enumerate() {
        out.push_str(&format!("  [{i}] {}\n", stmt_to_string(program, stmt)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProgramBuilder;

    #[test]
    fn float_literals_keep_a_decimal_digit() {
        assert_eq!(Literal::F32(0.0).to_string(), "0.0");
        assert_eq!(Literal::F32(2.0).to_string(), "2.0");
        assert_eq!(Literal::F32(0.123456).to_string(), "0.123456");
        assert_eq!(Literal::I32(-3).to_string(), "-3");
        assert_eq!(Literal::U32(7).to_string(), "7u");
    }

    #[test]
    fn statement_rendering() {
        let mut b = ProgramBuilder::new();
        let v4 = b.ty_vec4();
        let color = b.fragment_output("color", v4);
        let lhs = b.output(color);
        let lhs_r = b.swizzle(lhs, "r");
        let rhs = b.lit_f32(0.5);
        let stmt = b.compound(lhs_r, BinaryOp::Add, rhs);
        let p = b.finish();
        assert_eq!(stmt_to_string(&p, &stmt), "result.color.r += 0.5");
    }

    #[test]
    fn dump_lists_globals_and_body() {
        let mut b = ProgramBuilder::new();
        let v3 = b.ty_vec3();
        let pos = b.vertex_input("position", v3);
        let e = b.input(pos);
        let stmt = b.expr_stmt(e);
        b.push(stmt);
        let p = b.finish();
        let dump = dump_program(&p);
        assert!(dump.contains("attribute position: vec3"));
        assert!(dump.contains("[0] v.position"));
    }
}
