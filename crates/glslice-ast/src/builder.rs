//! Convenience builder for constructing typed programs.
//!
//! The host-language parser is an external collaborator; tests, demos, and
//! front ends use this builder to produce the typed tree the compiler
//! consumes. Construction is checked eagerly: type mismatches panic at
//! build time, the way arena construction asserts its invariants.

use crate::arena::Handle;
use crate::expr::{BinaryOp, Callee, Expr, ExprKind, Literal, MathFunction, SwizzlePattern, UnaryOp};
use crate::program::{ProcDef, Program};
use crate::stmt::{Block, Interpolation, Stmt};
use crate::symbol::{BuiltinVar, GlobalClass, Symbol, SymbolKind};
use crate::types::{Scalar, ScalarKind, SamplerDim, StructMember, Type, TypeInner, VectorSize};

/// Builds a [`Program`] piece by piece.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_attribute_location: u32,
    next_output_index: u32,
    attr_record: Option<Handle<Symbol>>,
    result_record: Option<Handle<Symbol>>,
    position: Option<Handle<Symbol>>,
    frag_coord: Option<Handle<Symbol>>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finishes construction, yielding the immutable program.
    pub fn finish(self) -> Program {
        self.program
    }

    // ---- types ----

    pub fn ty_f32(&mut self) -> Handle<Type> {
        self.scalar_ty(Scalar::F32)
    }

    pub fn ty_i32(&mut self) -> Handle<Type> {
        self.scalar_ty(Scalar::I32)
    }

    pub fn ty_u32(&mut self) -> Handle<Type> {
        self.scalar_ty(Scalar::U32)
    }

    pub fn ty_bool(&mut self) -> Handle<Type> {
        self.scalar_ty(Scalar::BOOL)
    }

    pub fn scalar_ty(&mut self, scalar: Scalar) -> Handle<Type> {
        self.program.types.insert(Type {
            name: None,
            inner: TypeInner::Scalar(scalar),
        })
    }

    pub fn vector_ty(&mut self, size: VectorSize, scalar: Scalar) -> Handle<Type> {
        self.program.types.insert(Type {
            name: None,
            inner: TypeInner::Vector { size, scalar },
        })
    }

    pub fn ty_vec2(&mut self) -> Handle<Type> {
        self.vector_ty(VectorSize::Bi, Scalar::F32)
    }

    pub fn ty_vec3(&mut self) -> Handle<Type> {
        self.vector_ty(VectorSize::Tri, Scalar::F32)
    }

    pub fn ty_vec4(&mut self) -> Handle<Type> {
        self.vector_ty(VectorSize::Quad, Scalar::F32)
    }

    /// A host `MatRxC<float>`: `rows` by `columns`, stored column-major the
    /// way GLSL names it.
    pub fn matrix_ty(&mut self, rows: VectorSize, columns: VectorSize) -> Handle<Type> {
        self.program.types.insert(Type {
            name: None,
            inner: TypeInner::Matrix { columns, rows },
        })
    }

    pub fn ty_mat4(&mut self) -> Handle<Type> {
        self.matrix_ty(VectorSize::Quad, VectorSize::Quad)
    }

    pub fn array_ty(&mut self, base: Handle<Type>, size: u32) -> Handle<Type> {
        self.program.types.insert(Type {
            name: None,
            inner: TypeInner::Array { base, size },
        })
    }

    pub fn struct_ty(&mut self, name: &str, members: Vec<StructMember>) -> Handle<Type> {
        self.program.types.insert(Type {
            name: Some(name.to_string()),
            inner: TypeInner::Struct { members },
        })
    }

    pub fn sampler_ty(&mut self, dim: SamplerDim) -> Handle<Type> {
        self.program.types.insert(Type {
            name: None,
            inner: TypeInner::Sampler { dim },
        })
    }

    /// A host-only reference type. Has no GLSL spelling; exists so front
    /// ends can hand over complete trees and get a proper error back.
    pub fn pointer_ty(&mut self, base: Handle<Type>) -> Handle<Type> {
        self.program.types.insert(Type {
            name: None,
            inner: TypeInner::Pointer { base },
        })
    }

    // ---- symbols ----

    fn add_symbol(&mut self, sym: Symbol) -> Handle<Symbol> {
        self.program.symbols.append(sym)
    }

    /// Declares a module-level compile-time constant.
    pub fn module_const(&mut self, name: &str, ty: Handle<Type>) -> Handle<Symbol> {
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::ModuleConst,
            ty,
            class: Some(GlobalClass::ModuleConst),
            parent: None,
            loc: None,
        })
    }

    /// Declares a CPU-dynamic global, delivered to shaders as a uniform.
    pub fn uniform(&mut self, name: &str, ty: Handle<Type>) -> Handle<Symbol> {
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Global,
            ty,
            class: Some(GlobalClass::CpuDynamic),
            parent: None,
            loc: None,
        })
    }

    /// Declares a texture sampler global.
    pub fn texture_uniform(&mut self, name: &str, dim: SamplerDim) -> Handle<Symbol> {
        let ty = self.sampler_ty(dim);
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Global,
            ty,
            class: Some(GlobalClass::Sampler),
            parent: None,
            loc: None,
        })
    }

    fn attr_record(&mut self) -> Handle<Symbol> {
        if let Some(h) = self.attr_record {
            return h;
        }
        let ty = self.struct_ty("VertexIn", Vec::new());
        let h = self.add_symbol(Symbol {
            name: "v".into(),
            kind: SymbolKind::Param,
            ty,
            class: None,
            parent: None,
            loc: None,
        });
        self.attr_record = Some(h);
        h
    }

    fn result_record(&mut self) -> Handle<Symbol> {
        if let Some(h) = self.result_record {
            return h;
        }
        let ty = self.struct_ty("FragmentOut", Vec::new());
        let h = self.add_symbol(Symbol {
            name: "result".into(),
            kind: SymbolKind::Result,
            ty,
            class: None,
            parent: None,
            loc: None,
        });
        self.result_record = Some(h);
        h
    }

    /// Declares a vertex-attribute field of the `v` input record,
    /// assigning the next input location.
    pub fn vertex_input(&mut self, name: &str, ty: Handle<Type>) -> Handle<Symbol> {
        let parent = self.attr_record();
        let location = self.next_attribute_location;
        self.next_attribute_location += 1;
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Field,
            ty,
            class: Some(GlobalClass::Attribute { location }),
            parent: Some(parent),
            loc: None,
        })
    }

    /// Declares a fragment-output field of the `result` record,
    /// assigning the next output index.
    pub fn fragment_output(&mut self, name: &str, ty: Handle<Type>) -> Handle<Symbol> {
        let parent = self.result_record();
        let index = self.next_output_index;
        self.next_output_index += 1;
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Field,
            ty,
            class: Some(GlobalClass::FragOutput { index }),
            parent: Some(parent),
            loc: None,
        })
    }

    /// Declares a function-local variable.
    pub fn local(&mut self, name: &str, ty: Handle<Type>) -> Handle<Symbol> {
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Local,
            ty,
            class: None,
            parent: None,
            loc: None,
        })
    }

    /// Declares a procedure parameter.
    pub fn param(&mut self, name: &str, ty: Handle<Type>) -> Handle<Symbol> {
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Param,
            ty,
            class: None,
            parent: None,
            loc: None,
        })
    }

    /// Declares a record-field symbol for struct member access.
    pub fn field_sym(&mut self, name: &str, ty: Handle<Type>) -> Handle<Symbol> {
        self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Field,
            ty,
            class: None,
            parent: None,
            loc: None,
        })
    }

    /// Defines a user procedure.
    pub fn proc(
        &mut self,
        name: &str,
        params: Vec<Handle<Symbol>>,
        result: Option<Handle<Type>>,
        body: Block,
    ) -> Handle<ProcDef> {
        let void_ty = self.struct_ty("Void", Vec::new());
        let sym = self.add_symbol(Symbol {
            name: name.into(),
            kind: SymbolKind::Proc,
            ty: result.unwrap_or(void_ty),
            class: None,
            parent: None,
            loc: None,
        });
        self.program.procs.append(ProcDef {
            sym,
            params,
            result,
            body,
        })
    }

    fn builtin(&mut self, var: BuiltinVar) -> Handle<Symbol> {
        let cached = match var {
            BuiltinVar::Position => &mut self.position,
            BuiltinVar::FragCoord => &mut self.frag_coord,
        };
        if let Some(h) = *cached {
            return h;
        }
        let ty = self.vector_ty(VectorSize::Quad, Scalar::F32);
        let name = var.glsl_name().to_string();
        let h = self.add_symbol(Symbol {
            name,
            kind: SymbolKind::Global,
            ty,
            class: Some(GlobalClass::Builtin(var)),
            parent: None,
            loc: None,
        });
        match var {
            BuiltinVar::Position => self.position = Some(h),
            BuiltinVar::FragCoord => self.frag_coord = Some(h),
        }
        h
    }

    // ---- expressions ----

    fn add_expr(&mut self, kind: ExprKind, ty: Handle<Type>) -> Handle<Expr> {
        self.program.exprs.append(Expr {
            kind,
            ty,
            loc: None,
        })
    }

    fn inner(&self, ty: Handle<Type>) -> &TypeInner {
        &self.program.types[ty].inner
    }

    pub fn lit_f32(&mut self, value: f32) -> Handle<Expr> {
        let ty = self.ty_f32();
        self.add_expr(ExprKind::Literal(Literal::F32(value)), ty)
    }

    pub fn lit_i32(&mut self, value: i32) -> Handle<Expr> {
        let ty = self.ty_i32();
        self.add_expr(ExprKind::Literal(Literal::I32(value)), ty)
    }

    pub fn lit_u32(&mut self, value: u32) -> Handle<Expr> {
        let ty = self.ty_u32();
        self.add_expr(ExprKind::Literal(Literal::U32(value)), ty)
    }

    pub fn lit_bool(&mut self, value: bool) -> Handle<Expr> {
        let ty = self.ty_bool();
        self.add_expr(ExprKind::Literal(Literal::Bool(value)), ty)
    }

    /// A reference to any declared symbol.
    pub fn read(&mut self, sym: Handle<Symbol>) -> Handle<Expr> {
        let ty = self.program.symbols[sym].ty;
        self.add_expr(ExprKind::SymbolRef(sym), ty)
    }

    /// `gl.Position`.
    pub fn position(&mut self) -> Handle<Expr> {
        let sym = self.builtin(BuiltinVar::Position);
        self.read(sym)
    }

    /// `gl.FragCoord`.
    pub fn frag_coord(&mut self) -> Handle<Expr> {
        let sym = self.builtin(BuiltinVar::FragCoord);
        self.read(sym)
    }

    /// `v.<field>`: dot access to a vertex-attribute field.
    pub fn input(&mut self, field: Handle<Symbol>) -> Handle<Expr> {
        let record = self.attr_record();
        assert_eq!(
            self.program.symbols[field].parent,
            Some(record),
            "input() requires a vertex_input field"
        );
        let base = self.read(record);
        let ty = self.program.symbols[field].ty;
        self.add_expr(ExprKind::Member { base, field }, ty)
    }

    /// `result.<field>`: dot access to a fragment-output field.
    pub fn output(&mut self, field: Handle<Symbol>) -> Handle<Expr> {
        let record = self.result_record();
        assert_eq!(
            self.program.symbols[field].parent,
            Some(record),
            "output() requires a fragment_output field"
        );
        let base = self.read(record);
        let ty = self.program.symbols[field].ty;
        self.add_expr(ExprKind::Member { base, field }, ty)
    }

    /// Struct member access on an arbitrary base expression.
    pub fn member(&mut self, base: Handle<Expr>, field: Handle<Symbol>) -> Handle<Expr> {
        let ty = self.program.symbols[field].ty;
        self.add_expr(ExprKind::Member { base, field }, ty)
    }

    /// A swizzle such as `.xyz` or `.r`.
    pub fn swizzle(&mut self, base: Handle<Expr>, pattern: &str) -> Handle<Expr> {
        let pattern = SwizzlePattern::parse(pattern);
        let base_ty = self.program.exprs[base].ty;
        let base_inner = self.inner(base_ty).clone();
        let scalar = match base_inner {
            TypeInner::Vector { scalar, .. } => scalar,
            other => panic!("swizzle base must be a vector, got {other:?}"),
        };
        let ty = match pattern.components.len() {
            1 => self.scalar_ty(scalar),
            2 => self.vector_ty(VectorSize::Bi, scalar),
            3 => self.vector_ty(VectorSize::Tri, scalar),
            _ => self.vector_ty(VectorSize::Quad, scalar),
        };
        self.add_expr(ExprKind::Swizzle { base, pattern }, ty)
    }

    /// Bracket indexing.
    pub fn index(&mut self, base: Handle<Expr>, index: Handle<Expr>) -> Handle<Expr> {
        let base_ty = self.program.exprs[base].ty;
        let base_inner = self.inner(base_ty).clone();
        let ty = match base_inner {
            TypeInner::Array { base, .. } => base,
            TypeInner::Vector { scalar, .. } => self.scalar_ty(scalar),
            TypeInner::Matrix { rows, .. } => self.vector_ty(rows, Scalar::F32),
            other => panic!("cannot index into {other:?}"),
        };
        self.add_expr(ExprKind::Index { base, index }, ty)
    }

    pub fn unary(&mut self, op: UnaryOp, expr: Handle<Expr>) -> Handle<Expr> {
        let ty = self.program.exprs[expr].ty;
        self.add_expr(ExprKind::Unary { op, expr }, ty)
    }

    pub fn not(&mut self, expr: Handle<Expr>) -> Handle<Expr> {
        self.unary(UnaryOp::LogicalNot, expr)
    }

    pub fn neg(&mut self, expr: Handle<Expr>) -> Handle<Expr> {
        self.unary(UnaryOp::Negate, expr)
    }

    /// An infix operator application with host-side type rules.
    ///
    /// # Panics
    ///
    /// Panics on operand type mismatches, including comparisons between a
    /// vector and a scalar (component access is required first).
    pub fn binary(
        &mut self,
        op: BinaryOp,
        left: Handle<Expr>,
        right: Handle<Expr>,
    ) -> Handle<Expr> {
        let lt = self.program.exprs[left].ty;
        let rt = self.program.exprs[right].ty;
        let ty = self.binary_result_ty(op, lt, rt);
        self.add_expr(ExprKind::Binary { op, left, right }, ty)
    }

    fn binary_result_ty(
        &mut self,
        op: BinaryOp,
        lt: Handle<Type>,
        rt: Handle<Type>,
    ) -> Handle<Type> {
        let li = self.inner(lt).clone();
        let ri = self.inner(rt).clone();

        if op.is_comparison() {
            match (&li, &ri) {
                (TypeInner::Scalar(a), TypeInner::Scalar(b)) if a == b => return self.ty_bool(),
                _ => panic!(
                    "comparison requires matching scalar operands; use a component access on vectors"
                ),
            }
        }

        match op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                assert!(
                    matches!(li, TypeInner::Scalar(s) if s.kind == ScalarKind::Bool)
                        && matches!(ri, TypeInner::Scalar(s) if s.kind == ScalarKind::Bool),
                    "logical operators require bool operands"
                );
                return self.ty_bool();
            }
            BinaryOp::BitwiseAnd
            | BinaryOp::BitwiseOr
            | BinaryOp::BitwiseXor
            | BinaryOp::ShiftLeft
            | BinaryOp::ShiftRight => {
                assert!(
                    matches!(
                        li,
                        TypeInner::Scalar(s)
                            if s.kind == ScalarKind::Sint || s.kind == ScalarKind::Uint
                    ),
                    "bitwise operators require integer operands"
                );
                return lt;
            }
            _ => {}
        }

        // Arithmetic.
        match (&li, &ri) {
            _ if lt == rt => lt,
            (TypeInner::Vector { scalar, .. }, TypeInner::Scalar(s)) if scalar == s => lt,
            (TypeInner::Scalar(s), TypeInner::Vector { scalar, .. }) if scalar == s => rt,
            (TypeInner::Matrix { columns, rows }, TypeInner::Vector { size, scalar })
                if op == BinaryOp::Multiply
                    && columns == size
                    && scalar.kind == ScalarKind::Float =>
            {
                self.vector_ty(*rows, Scalar::F32)
            }
            (TypeInner::Vector { size, scalar }, TypeInner::Matrix { columns, rows })
                if op == BinaryOp::Multiply
                    && rows == size
                    && scalar.kind == ScalarKind::Float =>
            {
                self.vector_ty(*columns, Scalar::F32)
            }
            (TypeInner::Matrix { rows, .. }, TypeInner::Matrix { columns, .. })
                if op == BinaryOp::Multiply =>
            {
                self.matrix_ty(*rows, *columns)
            }
            (TypeInner::Matrix { .. }, TypeInner::Scalar(s)) if s.kind == ScalarKind::Float => lt,
            (TypeInner::Scalar(s), TypeInner::Matrix { .. }) if s.kind == ScalarKind::Float => rt,
            _ => panic!("no operator rule for {li:?} {op:?} {ri:?}"),
        }
    }

    pub fn add(&mut self, l: Handle<Expr>, r: Handle<Expr>) -> Handle<Expr> {
        self.binary(BinaryOp::Add, l, r)
    }

    pub fn sub(&mut self, l: Handle<Expr>, r: Handle<Expr>) -> Handle<Expr> {
        self.binary(BinaryOp::Subtract, l, r)
    }

    pub fn mul(&mut self, l: Handle<Expr>, r: Handle<Expr>) -> Handle<Expr> {
        self.binary(BinaryOp::Multiply, l, r)
    }

    pub fn gt(&mut self, l: Handle<Expr>, r: Handle<Expr>) -> Handle<Expr> {
        self.binary(BinaryOp::Greater, l, r)
    }

    /// A conditional expression, lowered by the emitter to a ternary.
    pub fn select(
        &mut self,
        condition: Handle<Expr>,
        accept: Handle<Expr>,
        reject: Handle<Expr>,
    ) -> Handle<Expr> {
        let ty = self.program.exprs[accept].ty;
        assert_eq!(
            ty, self.program.exprs[reject].ty,
            "conditional arms must agree on type"
        );
        self.add_expr(
            ExprKind::Select {
                condition,
                accept,
                reject,
            },
            ty,
        )
    }

    /// A math builtin call.
    pub fn math(&mut self, fun: MathFunction, args: &[Handle<Expr>]) -> Handle<Expr> {
        assert_eq!(
            args.len(),
            fun.arg_count(),
            "{} takes {} argument(s)",
            fun.glsl_name(),
            fun.arg_count()
        );
        let ty = match fun {
            MathFunction::Dot | MathFunction::Length | MathFunction::Distance => self.ty_f32(),
            _ => self.program.exprs[args[0]].ty,
        };
        self.add_expr(
            ExprKind::Call {
                callee: Callee::Math(fun),
                args: args.to_vec(),
            },
            ty,
        )
    }

    /// A texture sampling call: `texture(sampler, coords)`.
    pub fn texture(&mut self, sampler: Handle<Symbol>, coords: Handle<Expr>) -> Handle<Expr> {
        let (class, sampler_ty) = {
            let sym = &self.program.symbols[sampler];
            (sym.class, sym.ty)
        };
        assert_eq!(
            class,
            Some(GlobalClass::Sampler),
            "texture() requires a sampler global"
        );
        let dim = match *self.inner(sampler_ty) {
            TypeInner::Sampler { dim } => dim,
            ref other => panic!("sampler symbol has non-sampler type {other:?}"),
        };
        let sampler_ref = self.read(sampler);
        let ty = match dim {
            SamplerDim::Shadow2D => self.ty_f32(),
            _ => self.ty_vec4(),
        };
        self.add_expr(
            ExprKind::Call {
                callee: Callee::Texture,
                args: vec![sampler_ref, coords],
            },
            ty,
        )
    }

    /// A conversion/constructor call, spelled `T(args)` in GLSL.
    pub fn construct(&mut self, ty: Handle<Type>, args: &[Handle<Expr>]) -> Handle<Expr> {
        self.add_expr(
            ExprKind::Call {
                callee: Callee::Construct(ty),
                args: args.to_vec(),
            },
            ty,
        )
    }

    /// A call to a user procedure.
    pub fn call(&mut self, proc: Handle<ProcDef>, args: &[Handle<Expr>]) -> Handle<Expr> {
        let def = &self.program.procs[proc];
        assert_eq!(
            args.len(),
            def.params.len(),
            "procedure argument count mismatch"
        );
        let ty = def
            .result
            .unwrap_or_else(|| panic!("void procedure used as an expression"));
        self.add_expr(
            ExprKind::Call {
                callee: Callee::Proc(proc),
                args: args.to_vec(),
            },
            ty,
        )
    }

    // ---- statements ----

    /// Appends a statement to the top-level pipeline body.
    pub fn push(&mut self, stmt: Stmt) {
        self.program.body.push(stmt);
    }

    pub fn assign(&mut self, lhs: Handle<Expr>, rhs: Handle<Expr>) -> Stmt {
        Stmt::Assign {
            lhs,
            op: None,
            rhs,
        }
    }

    /// A compound assignment such as `lhs += rhs`.
    pub fn compound(&mut self, lhs: Handle<Expr>, op: BinaryOp, rhs: Handle<Expr>) -> Stmt {
        Stmt::Assign {
            lhs,
            op: Some(op),
            rhs,
        }
    }

    pub fn let_(&mut self, var: Handle<Symbol>, init: Handle<Expr>) -> Stmt {
        Stmt::Local {
            var,
            init: Some(init),
        }
    }

    /// A declaration without an initializer (zero-initialized).
    pub fn decl(&mut self, var: Handle<Symbol>) -> Stmt {
        Stmt::Local { var, init: None }
    }

    pub fn if_(&mut self, condition: Handle<Expr>, accept: Block, reject: Block) -> Stmt {
        Stmt::If {
            condition,
            accept,
            reject,
        }
    }

    pub fn for_range(
        &mut self,
        var: Handle<Symbol>,
        start: Handle<Expr>,
        end: Handle<Expr>,
        body: Block,
    ) -> Stmt {
        Stmt::ForRange {
            var,
            start,
            end,
            body,
        }
    }

    pub fn for_each(&mut self, var: Handle<Symbol>, array: Handle<Expr>, body: Block) -> Stmt {
        Stmt::ForEach { var, array, body }
    }

    pub fn while_(&mut self, condition: Handle<Expr>, body: Block) -> Stmt {
        Stmt::While { condition, body }
    }

    pub fn ret(&mut self, value: Option<Handle<Expr>>) -> Stmt {
        Stmt::Return { value }
    }

    pub fn expr_stmt(&mut self, expr: Handle<Expr>) -> Stmt {
        Stmt::Expr(expr)
    }

    /// The `interpolate(x)` / `interpolate(x, flat)` override.
    pub fn interpolate(&mut self, target: Handle<Expr>, qualifier: Option<Interpolation>) -> Stmt {
        Stmt::Interpolate { target, qualifier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_vector_arithmetic() {
        let mut b = ProgramBuilder::new();
        let x = b.lit_f32(1.0);
        let y = b.lit_f32(2.0);
        let sum = b.add(x, y);
        let v3 = b.ty_vec3();
        let v = b.construct(v3, &[sum, x, y]);
        let scaled = b.mul(v, y);
        let p = b.finish();
        assert_eq!(p.exprs[scaled].ty, v3);
    }

    #[test]
    fn matrix_vector_product_types() {
        let mut b = ProgramBuilder::new();
        let mvp = b.ty_mat4();
        let m = b.uniform("mvp", mvp);
        let v4 = b.ty_vec4();
        let pos = b.vertex_input("position", v4);
        let mr = b.read(m);
        let pr = b.input(pos);
        let out = b.mul(mr, pr);
        let p = b.finish();
        assert_eq!(p.exprs[out].ty, v4);
    }

    #[test]
    fn swizzle_types() {
        let mut b = ProgramBuilder::new();
        let v4 = b.ty_vec4();
        let c = b.fragment_output("color", v4);
        let e = b.output(c);
        let rgb = b.swizzle(e, "rgb");
        let r = b.swizzle(e, "r");
        let f32_ty = b.ty_f32();
        let v3 = b.ty_vec3();
        let p = b.finish();
        assert_eq!(p.exprs[rgb].ty, v3);
        assert_eq!(p.exprs[r].ty, f32_ty);
    }

    #[test]
    #[should_panic(expected = "component access")]
    fn vector_comparison_is_rejected() {
        let mut b = ProgramBuilder::new();
        let pos = b.position();
        let half = b.lit_f32(0.5);
        b.gt(pos, half);
    }

    #[test]
    fn attribute_locations_count_up() {
        let mut b = ProgramBuilder::new();
        let v3 = b.ty_vec3();
        let v2 = b.ty_vec2();
        let p0 = b.vertex_input("position", v3);
        let p1 = b.vertex_input("texcoord", v2);
        let p = b.finish();
        assert_eq!(p.symbols[p0].attribute_location(), Some(0));
        assert_eq!(p.symbols[p1].attribute_location(), Some(1));
    }

    #[test]
    fn texture_call_produces_vec4() {
        let mut b = ProgramBuilder::new();
        let tex = b.texture_uniform("myTex", SamplerDim::D2);
        let v2 = b.ty_vec2();
        let uv = b.vertex_input("texcoord", v2);
        let uv_ref = b.input(uv);
        let sample = b.texture(tex, uv_ref);
        let v4 = b.ty_vec4();
        let p = b.finish();
        assert_eq!(p.exprs[sample].ty, v4);
    }
}
