//! The GLSL 4.40 emitter.
//!
//! Serializes one stage of a partitioned program into conformant GLSL:
//! declaration prologue (`uniform`, `in`, `out`), procedure definitions,
//! and a `main` that aliases incoming values to stage-local names, runs
//! the stage's reordered statements, and forwards outgoing varyings.

use std::collections::{BTreeMap, BTreeSet};

use glslice_ast::names::{sanitize, NameTable};
use glslice_ast::{
    BinaryOp, BuiltinVar, Callee, Expr, ExprKind, GlobalClass, Handle, Interpolation, ProcDef,
    Program, Scalar, ScalarKind, Stmt, Symbol, Type, TypeInner, VectorSize,
};
use glslice_partition::{BoundaryPlan, PartitionPlan, Tier, VarId, Varying, VaryingPlan};

use crate::CompileError;

/// Where an expression is being rendered: inside a stage `main` (names
/// carry the stage prefix and aliases are in scope) or inside a
/// procedure body (plain parameter/local names, direct uniform names).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Main(Tier),
    Proc,
}

/// Emits per-stage GLSL documents for one compile.
///
/// Procedure definitions are rendered once and memoized in an
/// emitter-owned map for the duration of the compile; no state outlives
/// it.
pub struct GlslEmitter<'a> {
    program: &'a Program,
    plan: &'a PartitionPlan,
    varyings: &'a VaryingPlan,
    names: &'a mut NameTable,
    proc_cache: BTreeMap<Handle<ProcDef>, String>,
}

impl<'a> GlslEmitter<'a> {
    pub fn new(
        program: &'a Program,
        plan: &'a PartitionPlan,
        varyings: &'a VaryingPlan,
        names: &'a mut NameTable,
    ) -> Self {
        Self {
            program,
            plan,
            varyings,
            names,
            proc_cache: BTreeMap::new(),
        }
    }

    fn ident(&mut self, sym: Handle<Symbol>) -> String {
        self.names.ident(&self.program.symbols, sym)
    }

    fn var_ident(&mut self, var: VarId) -> String {
        match var {
            VarId::Sym(h) => self.ident(h),
            VarId::Builtin(b) => sanitize(b.glsl_name()),
        }
    }

    fn var_class(&self, var: VarId) -> Option<GlobalClass> {
        match var {
            VarId::Sym(h) => self.program.symbols[h].class,
            VarId::Builtin(b) => Some(GlobalClass::Builtin(b)),
        }
    }

    fn var_type_spelling(&self, var: VarId) -> Result<String, CompileError> {
        match var {
            VarId::Sym(h) => {
                Ok(glslice_ast::glsl_type_name(&self.program.types, self.program.symbols[h].ty)?)
            }
            VarId::Builtin(_) => Ok("vec4".to_string()),
        }
    }

    /// The on-wire spelling of a varying: booleans travel as integers.
    fn wire_type_spelling(&self, var: VarId) -> Result<String, CompileError> {
        if let VarId::Sym(h) = var {
            match self.program.types[self.program.symbols[h].ty].inner {
                TypeInner::Scalar(Scalar {
                    kind: ScalarKind::Bool,
                    ..
                }) => return Ok("int".to_string()),
                TypeInner::Vector {
                    size,
                    scalar:
                        Scalar {
                            kind: ScalarKind::Bool,
                            ..
                        },
                } => return Ok(format!("ivec{}", size as u32)),
                _ => {}
            }
        }
        self.var_type_spelling(var)
    }

    /// The vector size of a `bvecN`-typed location, `None` otherwise.
    fn var_is_bool(&self, var: VarId) -> Option<VectorSize> {
        match var {
            VarId::Sym(h) => match self.program.types[self.program.symbols[h].ty].inner {
                TypeInner::Vector {
                    size,
                    scalar:
                        Scalar {
                            kind: ScalarKind::Bool,
                            ..
                        },
                } => Some(size),
                _ => None,
            },
            _ => None,
        }
    }

    fn var_is_bool_scalar(&self, var: VarId) -> bool {
        match var {
            VarId::Sym(h) => matches!(
                self.program.types[self.program.symbols[h].ty].inner,
                TypeInner::Scalar(Scalar {
                    kind: ScalarKind::Bool,
                    ..
                })
            ),
            _ => false,
        }
    }

    /// The name a location goes by in the given scope.
    fn var_name(&mut self, scope: Scope, var: VarId) -> String {
        match scope {
            Scope::Proc => match self.var_class(var) {
                Some(GlobalClass::ModuleConst) | Some(GlobalClass::CpuDynamic) => {
                    format!("uniform_{}", self.var_ident(var))
                }
                Some(GlobalClass::Sampler) => self.var_ident(var),
                Some(GlobalClass::Builtin(b)) => b.glsl_name().to_string(),
                _ => self.var_ident(var),
            },
            Scope::Main(stage) => match self.var_class(var) {
                Some(GlobalClass::Builtin(BuiltinVar::Position)) if stage == Tier::Vs => {
                    "gl_Position".to_string()
                }
                Some(GlobalClass::Builtin(BuiltinVar::FragCoord)) => "gl_FragCoord".to_string(),
                Some(GlobalClass::Sampler) => self.var_ident(var),
                Some(GlobalClass::FragOutput { .. }) if stage == Tier::Fs => {
                    format!("out_{}", self.var_ident(var))
                }
                _ => format!("{}_{}", stage.prefix(), self.var_ident(var)),
            },
        }
    }

    /// `T name` or `T name[N]` for declarations.
    fn declaration(&self, ty: Handle<Type>, name: &str) -> Result<String, CompileError> {
        match self.program.types[ty].inner {
            TypeInner::Array { base, size } => {
                let elem = glslice_ast::glsl_type_name(&self.program.types, base)?;
                Ok(format!("{elem} {name}[{size}]"))
            }
            _ => {
                let spelled = glslice_ast::glsl_type_name(&self.program.types, ty)?;
                Ok(format!("{spelled} {name}"))
            }
        }
    }

    /// The zero initializer `T(0)`, where the type supports one.
    fn zero_value(&self, ty: Handle<Type>) -> Result<Option<String>, CompileError> {
        match self.program.types[ty].inner {
            TypeInner::Scalar(_) | TypeInner::Vector { .. } | TypeInner::Matrix { .. } => {
                let spelled = glslice_ast::glsl_type_name(&self.program.types, ty)?;
                Ok(Some(format!("{spelled}(0)")))
            }
            _ => Ok(None),
        }
    }

    // ---- expressions ----

    fn binary_prec(op: BinaryOp) -> u8 {
        match op {
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 12,
            BinaryOp::Add | BinaryOp::Subtract => 11,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => 10,
            BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => 9,
            BinaryOp::Equal | BinaryOp::NotEqual => 8,
            BinaryOp::BitwiseAnd => 7,
            BinaryOp::BitwiseXor => 6,
            BinaryOp::BitwiseOr => 5,
            BinaryOp::LogicalAnd => 4,
            BinaryOp::LogicalOr => 3,
        }
    }

    /// Resolves an expression that denotes a storage location.
    fn expr_var(&self, handle: Handle<Expr>) -> Option<VarId> {
        match &self.program.exprs[handle].kind {
            ExprKind::SymbolRef(sym) => match self.program.symbols[*sym].class {
                Some(GlobalClass::Builtin(b)) => Some(VarId::Builtin(b)),
                _ => Some(VarId::Sym(*sym)),
            },
            ExprKind::Member { field, .. } => {
                let f = &self.program.symbols[*field];
                match f.class {
                    Some(GlobalClass::Attribute { .. }) | Some(GlobalClass::FragOutput { .. }) => {
                        Some(VarId::Sym(*field))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn write_expr(
        &mut self,
        out: &mut String,
        scope: Scope,
        handle: Handle<Expr>,
        min_prec: u8,
    ) -> Result<(), CompileError> {
        let expr = &self.program.exprs[handle];
        match &expr.kind {
            ExprKind::Literal(lit) => out.push_str(&lit.to_string()),
            ExprKind::SymbolRef(_) | ExprKind::Member { .. }
                if self.expr_var(handle).is_some() =>
            {
                let var = self.expr_var(handle).ok_or_else(|| {
                    CompileError::from(glslice_partition::PartitionError::Internal(
                        "location expression lost its variable".into(),
                    ))
                })?;
                let name = self.var_name(scope, var);
                out.push_str(&name);
            }
            ExprKind::SymbolRef(_) => unreachable!("guarded above"),
            ExprKind::Member { base, field } => {
                self.write_expr(out, scope, *base, 14)?;
                out.push('.');
                let field_name = sanitize(&self.program.symbols[*field].name);
                out.push_str(&field_name);
            }
            ExprKind::Swizzle { base, pattern } => {
                self.write_expr(out, scope, *base, 14)?;
                out.push('.');
                out.push_str(&pattern.glsl_postfix());
            }
            ExprKind::Index { base, index } => {
                self.write_expr(out, scope, *base, 14)?;
                out.push('[');
                self.write_expr(out, scope, *index, 0)?;
                out.push(']');
            }
            ExprKind::Unary { op, expr } => {
                let wrap = 13 < min_prec;
                if wrap {
                    out.push('(');
                }
                out.push_str(&op.to_string());
                self.write_expr(out, scope, *expr, 13)?;
                if wrap {
                    out.push(')');
                }
            }
            ExprKind::Binary { op, left, right } => {
                let prec = Self::binary_prec(*op);
                let wrap = prec < min_prec;
                if wrap {
                    out.push('(');
                }
                self.write_expr(out, scope, *left, prec)?;
                out.push(' ');
                out.push_str(&op.to_string());
                out.push(' ');
                self.write_expr(out, scope, *right, prec + 1)?;
                if wrap {
                    out.push(')');
                }
            }
            ExprKind::Select {
                condition,
                accept,
                reject,
            } => {
                out.push('(');
                self.write_expr(out, scope, *condition, 3)?;
                out.push_str(" ? ");
                self.write_expr(out, scope, *accept, 0)?;
                out.push_str(" : ");
                self.write_expr(out, scope, *reject, 0)?;
                out.push(')');
            }
            ExprKind::Call { callee, args } => {
                match callee {
                    Callee::Proc(p) => {
                        let sym = self.program.procs[*p].sym;
                        let name = self.ident(sym);
                        out.push_str(&name);
                    }
                    Callee::Math(m) => out.push_str(m.glsl_name()),
                    Callee::Texture => out.push_str("texture"),
                    Callee::Construct(ty) => {
                        out.push_str(&glslice_ast::glsl_type_name(&self.program.types, *ty)?)
                    }
                }
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_expr(out, scope, *arg, 0)?;
                }
                out.push(')');
            }
        }
        Ok(())
    }

    fn expr_string(&mut self, scope: Scope, handle: Handle<Expr>) -> Result<String, CompileError> {
        let mut out = String::new();
        self.write_expr(&mut out, scope, handle, 0)?;
        Ok(out)
    }

    // ---- statements ----

    fn write_block(
        &mut self,
        out: &mut String,
        scope: Scope,
        block: &[Stmt],
        indent: usize,
    ) -> Result<(), CompileError> {
        for stmt in block {
            self.write_stmt(out, scope, stmt, indent)?;
        }
        Ok(())
    }

    fn write_stmt(
        &mut self,
        out: &mut String,
        scope: Scope,
        stmt: &Stmt,
        indent: usize,
    ) -> Result<(), CompileError> {
        let pad = "    ".repeat(indent);
        match stmt {
            Stmt::Assign { lhs, op, rhs } => {
                let lhs_text = self.expr_string(scope, *lhs)?;
                let rhs_text = self.expr_string(scope, *rhs)?;
                match op {
                    Some(op) => out.push_str(&format!("{pad}{lhs_text} {op}= {rhs_text};\n")),
                    None => out.push_str(&format!("{pad}{lhs_text} = {rhs_text};\n")),
                }
            }
            Stmt::Local { var, init } => {
                let name = match scope {
                    Scope::Main(_) => self.var_name(scope, VarId::Sym(*var)),
                    Scope::Proc => self.ident(*var),
                };
                let ty = self.program.symbols[*var].ty;
                let decl = self.declaration(ty, &name)?;
                match init {
                    Some(init) => {
                        let text = self.expr_string(scope, *init)?;
                        out.push_str(&format!("{pad}{decl} = {text};\n"));
                    }
                    None => match self.zero_value(ty)? {
                        Some(zero) => out.push_str(&format!("{pad}{decl} = {zero};\n")),
                        None => out.push_str(&format!("{pad}{decl};\n")),
                    },
                }
            }
            Stmt::If {
                condition,
                accept,
                reject,
            } => {
                let cond = self.expr_string(scope, *condition)?;
                out.push_str(&format!("{pad}if ({cond}) {{\n"));
                self.write_block(out, scope, accept, indent + 1)?;
                self.write_else(out, scope, reject, indent)?;
            }
            Stmt::ForRange {
                var,
                start,
                end,
                body,
            } => {
                let name = match scope {
                    Scope::Main(_) => self.var_name(scope, VarId::Sym(*var)),
                    Scope::Proc => self.ident(*var),
                };
                let start_text = self.expr_string(scope, *start)?;
                let end_text = self.expr_string(scope, *end)?;
                out.push_str(&format!(
                    "{pad}for (int {name} = {start_text}; {name} < {end_text}; ++{name}) {{\n"
                ));
                self.write_block(out, scope, body, indent + 1)?;
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::ForEach { var, array, body } => {
                let array_ty = self.program.exprs[*array].ty;
                let (elem_ty, len) = match self.program.types[array_ty].inner {
                    TypeInner::Array { base, size } => (base, size),
                    _ => {
                        return Err(glslice_partition::PartitionError::Internal(
                            "items() iteration over a non-array survived validation".into(),
                        )
                        .into())
                    }
                };
                let name = match scope {
                    Scope::Main(_) => self.var_name(scope, VarId::Sym(*var)),
                    Scope::Proc => self.ident(*var),
                };
                let array_text = self.expr_string(scope, *array)?;
                let elem_decl = self.declaration(elem_ty, &name)?;
                out.push_str(&format!("{pad}for (int _i = 0; _i < {len}; ++_i) {{\n"));
                out.push_str(&format!(
                    "{pad}    {elem_decl} = {array_text}[_i];\n"
                ));
                self.write_block(out, scope, body, indent + 1)?;
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::While { condition, body } => {
                let cond = self.expr_string(scope, *condition)?;
                out.push_str(&format!("{pad}while ({cond}) {{\n"));
                self.write_block(out, scope, body, indent + 1)?;
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::Return { value } => match value {
                Some(value) => {
                    let text = self.expr_string(scope, *value)?;
                    out.push_str(&format!("{pad}return {text};\n"));
                }
                None => out.push_str(&format!("{pad}return;\n")),
            },
            Stmt::Expr(e) => {
                let text = self.expr_string(scope, *e)?;
                out.push_str(&format!("{pad}{text};\n"));
            }
            Stmt::Interpolate { .. } => {
                // Planner directive; nothing executes.
            }
        }
        Ok(())
    }

    /// Closes an `if` body, flattening a single nested `if` into
    /// `else if`.
    fn write_else(
        &mut self,
        out: &mut String,
        scope: Scope,
        reject: &[Stmt],
        indent: usize,
    ) -> Result<(), CompileError> {
        let pad = "    ".repeat(indent);
        match reject {
            [] => out.push_str(&format!("{pad}}}\n")),
            [Stmt::If {
                condition,
                accept,
                reject,
            }] => {
                let cond = self.expr_string(scope, *condition)?;
                out.push_str(&format!("{pad}}} else if ({cond}) {{\n"));
                self.write_block(out, scope, accept, indent + 1)?;
                self.write_else(out, scope, reject, indent)?;
            }
            _ => {
                out.push_str(&format!("{pad}}} else {{\n"));
                self.write_block(out, scope, reject, indent + 1)?;
                out.push_str(&format!("{pad}}}\n"));
            }
        }
        Ok(())
    }

    // ---- procedures ----

    /// Collects every procedure transitively called by the given block,
    /// callees before callers.
    fn procs_used(&self, block_stmts: &[usize]) -> Vec<Handle<ProcDef>> {
        let mut ordered = Vec::new();
        let mut seen = BTreeSet::new();

        let mut stack: Vec<Handle<Expr>> = Vec::new();
        for &i in block_stmts {
            collect_stmt_exprs(&self.program.body[i], &mut stack);
        }
        let mut proc_queue: Vec<Handle<ProcDef>> = Vec::new();
        while let Some(h) = stack.pop() {
            collect_expr_children(self.program, h, &mut stack);
            if let ExprKind::Call {
                callee: Callee::Proc(p),
                ..
            } = &self.program.exprs[h].kind
            {
                proc_queue.push(*p);
            }
        }

        while let Some(p) = proc_queue.pop() {
            self.visit_proc(p, &mut seen, &mut ordered);
        }
        ordered
    }

    fn visit_proc(
        &self,
        proc: Handle<ProcDef>,
        seen: &mut BTreeSet<Handle<ProcDef>>,
        ordered: &mut Vec<Handle<ProcDef>>,
    ) {
        if !seen.insert(proc) {
            return;
        }
        let mut stack: Vec<Handle<Expr>> = Vec::new();
        for stmt in &self.program.procs[proc].body {
            collect_stmt_exprs(stmt, &mut stack);
        }
        while let Some(h) = stack.pop() {
            collect_expr_children(self.program, h, &mut stack);
            if let ExprKind::Call {
                callee: Callee::Proc(p),
                ..
            } = &self.program.exprs[h].kind
            {
                self.visit_proc(*p, seen, ordered);
            }
        }
        ordered.push(proc);
    }

    fn render_proc(&mut self, proc: Handle<ProcDef>) -> Result<String, CompileError> {
        if let Some(text) = self.proc_cache.get(&proc) {
            return Ok(text.clone());
        }

        let def = self.program.procs[proc].clone();
        let name = self.ident(def.sym);
        let ret = match def.result {
            Some(ty) => glslice_ast::glsl_type_name(&self.program.types, ty)?,
            None => "void".to_string(),
        };
        let mut params = Vec::new();
        for &p in &def.params {
            let pname = self.ident(p);
            params.push(self.declaration(self.program.symbols[p].ty, &pname)?);
        }

        let mut text = format!("{ret} {name}({}) {{\n", params.join(", "));
        self.write_block(&mut text, Scope::Proc, &def.body, 1)?;
        text.push_str("}\n");

        self.proc_cache.insert(proc, text.clone());
        Ok(text)
    }

    // ---- stage documents ----

    fn varying_in_name(&mut self, boundary_from: Tier, boundary_to: Tier, v: &Varying) -> String {
        format!(
            "{}2{}_{}",
            boundary_from.prefix(),
            boundary_to.prefix(),
            v.ident
        )
    }

    fn qualifier_text(interpolation: Interpolation) -> &'static str {
        match interpolation {
            Interpolation::Smooth => "",
            Interpolation::Flat => "flat ",
            Interpolation::NoPerspective => "noperspective ",
        }
    }

    /// Emits the vertex or fragment stage document.
    pub fn emit_stage(&mut self, stage: Tier) -> Result<String, CompileError> {
        let body = self.plan.stage_body(stage);

        // Aggregate facts over the stage body.
        let mut env_reads: BTreeSet<VarId> = BTreeSet::new();
        let mut global_reads: BTreeSet<VarId> = BTreeSet::new();
        let mut writes: BTreeSet<VarId> = BTreeSet::new();
        let mut declared: BTreeSet<VarId> = BTreeSet::new();
        let mut first_write_partial: BTreeMap<VarId, bool> = BTreeMap::new();
        for &i in &body {
            let f = &self.plan.facts[i];
            env_reads.extend(f.env_reads.iter().copied());
            global_reads.extend(f.global_reads.iter().copied());
            for &w in &f.writes {
                writes.insert(w);
                first_write_partial
                    .entry(w)
                    .or_insert_with(|| f.partial_writes.contains(&w));
            }
            if let Stmt::Local { var, .. } = &self.program.body[i] {
                declared.insert(VarId::Sym(*var));
            }
        }

        // Incoming uniform deliveries.
        let uniforms: Vec<VarId> = self
            .plan
            .crossings
            .iter()
            .filter(|c| c.to == stage && !c.from.is_shader_stage())
            .map(|c| c.var)
            .collect();
        let mut uniform_decls: Vec<(String, VarId)> = uniforms
            .iter()
            .map(|&v| (self.var_ident(v), v))
            .collect();
        uniform_decls.sort();

        // Samplers bound to this stage.
        let sampler_vars: Vec<VarId> = global_reads
            .iter()
            .copied()
            .filter(|&v| matches!(self.var_class(v), Some(GlobalClass::Sampler)))
            .collect();
        let mut samplers: Vec<(String, VarId)> = sampler_vars
            .into_iter()
            .map(|v| (self.var_ident(v), v))
            .collect();
        samplers.sort();

        // Vertex attributes: read here or forwarded onward.
        let mut attributes: Vec<(u32, String, VarId)> = Vec::new();
        if stage == Tier::Vs {
            let mut attr_vars: BTreeSet<VarId> = global_reads
                .iter()
                .copied()
                .filter(|&v| matches!(self.var_class(v), Some(GlobalClass::Attribute { .. })))
                .collect();
            if let Some(boundary) = self.varyings.outgoing(stage) {
                for v in &boundary.varyings {
                    if matches!(self.var_class(v.var), Some(GlobalClass::Attribute { .. })) {
                        attr_vars.insert(v.var);
                    }
                }
            }
            for v in attr_vars {
                if let Some(GlobalClass::Attribute { location }) = self.var_class(v) {
                    attributes.push((location, self.var_ident(v), v));
                }
            }
            attributes.sort();
        }

        // Fragment outputs.
        let mut frag_outputs: Vec<(u32, String, VarId)> = Vec::new();
        if stage == Tier::Fs {
            for (h, sym) in self.program.symbols.iter() {
                if let Some(GlobalClass::FragOutput { index }) = sym.class {
                    let ident = self.names.ident(&self.program.symbols, h);
                    frag_outputs.push((index, ident, VarId::Sym(h)));
                }
            }
            frag_outputs.sort();
        }

        let incoming = if stage == Tier::Vs {
            None
        } else {
            self.varyings.incoming(stage).cloned()
        };
        let outgoing = if stage == Tier::Fs {
            None
        } else {
            self.varyings.outgoing(stage).cloned()
        };

        // Structs referenced by the stage.
        let struct_types = self.structs_used(&body)?;

        // Procedures, callees first.
        let procs = self.procs_used(&body);

        // ---- document assembly ----
        let mut doc = String::from("#version 440\n");

        if !struct_types.is_empty() {
            doc.push('\n');
            for ty in &struct_types {
                doc.push_str(&self.struct_decl(*ty)?);
            }
        }

        if !uniform_decls.is_empty() || !samplers.is_empty() {
            doc.push('\n');
            for (ident, var) in &uniform_decls {
                let spelled = self.var_type_spelling(*var)?;
                doc.push_str(&format!("uniform {spelled} uniform_{ident};\n"));
            }
            for (ident, var) in &samplers {
                let spelled = self.var_type_spelling(*var)?;
                doc.push_str(&format!("uniform {spelled} {ident};\n"));
            }
        }

        if !attributes.is_empty() {
            doc.push('\n');
            for (location, ident, var) in &attributes {
                let spelled = self.var_type_spelling(*var)?;
                doc.push_str(&format!(
                    "layout(location = {location}) in {spelled} {ident};\n"
                ));
            }
        }

        if let Some(boundary) = &incoming {
            if !boundary.varyings.is_empty() {
                doc.push('\n');
                for v in &boundary.varyings {
                    let name = self.varying_in_name(boundary.from, boundary.to, v);
                    let wire = self.wire_type_spelling(v.var)?;
                    doc.push_str(&format!(
                        "layout(location = {}) {}in {wire} {name};\n",
                        v.location,
                        Self::qualifier_text(v.interpolation)
                    ));
                }
            }
        }

        if let Some(boundary) = &outgoing {
            if !boundary.varyings.is_empty() {
                doc.push('\n');
                for v in &boundary.varyings {
                    let name = self.varying_in_name(boundary.from, boundary.to, v);
                    let wire = self.wire_type_spelling(v.var)?;
                    doc.push_str(&format!(
                        "layout(location = {}) {}out {wire} {name};\n",
                        v.location,
                        Self::qualifier_text(v.interpolation)
                    ));
                }
            }
        }

        if !frag_outputs.is_empty() {
            doc.push('\n');
            for (index, ident, var) in &frag_outputs {
                let spelled = self.var_type_spelling(*var)?;
                doc.push_str(&format!(
                    "layout(location = {index}) out {spelled} out_{ident};\n"
                ));
            }
        }

        for proc in procs {
            doc.push('\n');
            let text = self.render_proc(proc)?;
            doc.push_str(&text);
        }

        doc.push_str("\nvoid main() {\n");
        let scope = Scope::Main(stage);
        let mut aliased: BTreeSet<VarId> = BTreeSet::new();

        // (a) alias incoming uniforms to stage-local names.
        for (ident, var) in &uniform_decls {
            if stage == Tier::Fs
                && matches!(self.var_class(*var), Some(GlobalClass::FragOutput { .. }))
            {
                doc.push_str(&format!("    out_{ident} = uniform_{ident};\n"));
            } else {
                let local = self.var_name(scope, *var);
                let ty = match *var {
                    VarId::Sym(h) => self.program.symbols[h].ty,
                    VarId::Builtin(_) => unreachable!("builtins never arrive as uniforms"),
                };
                let decl = self.declaration(ty, &local)?;
                doc.push_str(&format!("    {decl} = uniform_{ident};\n"));
            }
            aliased.insert(*var);
        }

        // Alias attributes the body reads.
        for (_, ident, var) in &attributes {
            if !env_or_global_read(&env_reads, &global_reads, *var) {
                continue;
            }
            let local = self.var_name(scope, *var);
            let ty = match *var {
                VarId::Sym(h) => self.program.symbols[h].ty,
                VarId::Builtin(_) => continue,
            };
            let decl = self.declaration(ty, &local)?;
            doc.push_str(&format!("    {decl} = {ident};\n"));
            aliased.insert(*var);
        }

        // Alias incoming varyings, re-hydrating booleans.
        if let Some(boundary) = &incoming {
            for v in &boundary.varyings {
                let in_name = self.varying_in_name(boundary.from, boundary.to, v);
                let value = if self.var_is_bool_scalar(v.var) {
                    format!("{in_name} != 0")
                } else if let Some(size) = self.var_is_bool(v.var) {
                    format!("notEqual({in_name}, ivec{}(0))", size as u32)
                } else {
                    in_name.clone()
                };
                if stage == Tier::Fs
                    && matches!(self.var_class(v.var), Some(GlobalClass::FragOutput { .. }))
                {
                    doc.push_str(&format!("    out_{} = {value};\n", v.ident));
                } else {
                    let local = self.var_name(scope, v.var);
                    let ty = match v.var {
                        VarId::Sym(h) => Some(self.program.symbols[h].ty),
                        VarId::Builtin(_) => None,
                    };
                    match ty {
                        Some(ty) => {
                            let decl = self.declaration(ty, &local)?;
                            doc.push_str(&format!("    {decl} = {value};\n"));
                        }
                        None => doc.push_str(&format!("    vec4 {local} = {value};\n")),
                    }
                }
                aliased.insert(v.var);
            }
        }

        // Seed outputs and stage-local instances: anything the body
        // reads or writes that no declaration or alias has provided yet
        // starts from its zero value.
        let mut instance_vars: BTreeSet<VarId> = writes.clone();
        instance_vars.extend(env_reads.iter().copied());
        if let Some(boundary) = &outgoing {
            // Forwarded values the body never touches still need a
            // stage-local instance to copy from.
            for v in &boundary.varyings {
                match self.var_class(v.var) {
                    Some(GlobalClass::Attribute { .. })
                    | Some(GlobalClass::Builtin(_))
                    | Some(GlobalClass::Sampler) => {}
                    _ => {
                        instance_vars.insert(v.var);
                    }
                }
            }
        }
        for &var in &instance_vars {
            if aliased.contains(&var) || declared.contains(&var) {
                continue;
            }
            match self.var_class(var) {
                Some(GlobalClass::Builtin(BuiltinVar::Position)) if stage == Tier::Vs => continue,
                Some(GlobalClass::FragOutput { .. }) if stage == Tier::Fs => {
                    // Seed the out variable only when the body observes
                    // the previous value.
                    let needs_seed = env_reads.contains(&var)
                        || first_write_partial.get(&var).copied().unwrap_or(false);
                    if needs_seed {
                        if let VarId::Sym(h) = var {
                            if let Some(zero) = self.zero_value(self.program.symbols[h].ty)? {
                                let ident = self.var_ident(var);
                                doc.push_str(&format!("    out_{ident} = {zero};\n"));
                            }
                        }
                    }
                }
                _ => {
                    let VarId::Sym(h) = var else { continue };
                    let ty = self.program.symbols[h].ty;
                    let local = self.var_name(scope, var);
                    let decl = self.declaration(ty, &local)?;
                    match self.zero_value(ty)? {
                        Some(zero) => doc.push_str(&format!("    {decl} = {zero};\n")),
                        None => doc.push_str(&format!("    {decl};\n")),
                    }
                }
            }
        }

        // (b) the stage's reordered statements.
        for &i in &body {
            let stmt = self.program.body[i].clone();
            self.write_stmt(&mut doc, scope, &stmt, 1)?;
        }

        // (c) forwarding epilogue.
        if let Some(boundary) = &outgoing {
            for v in &boundary.varyings {
                let out_name = self.varying_in_name(boundary.from, boundary.to, v);
                let source = if aliased.contains(&v.var)
                    || writes.contains(&v.var)
                    || declared.contains(&v.var)
                    || !matches!(self.var_class(v.var), Some(GlobalClass::Attribute { .. }))
                {
                    self.var_name(scope, v.var)
                } else {
                    // A forwarded attribute the body never read: copy the
                    // input declaration straight through.
                    self.var_ident(v.var)
                };
                let encoded = if self.var_is_bool_scalar(v.var) {
                    format!("{source} ? 1 : 0")
                } else if let Some(size) = self.var_is_bool(v.var) {
                    format!("ivec{}({source})", size as u32)
                } else {
                    source
                };
                doc.push_str(&format!("    {out_name} = {encoded};\n"));
            }
        }

        doc.push_str("}\n");
        Ok(doc)
    }

    /// Synthesizes the forwarding-only geometry stage: every varying is
    /// declared as a matching in/out pair and copied through per vertex.
    pub fn emit_geometry(&mut self) -> Result<String, CompileError> {
        let incoming = self
            .varyings
            .incoming(Tier::Gs)
            .cloned()
            .unwrap_or(BoundaryPlan {
                from: Tier::Vs,
                to: Tier::Gs,
                varyings: Vec::new(),
            });
        let outgoing = self
            .varyings
            .outgoing(Tier::Gs)
            .cloned()
            .unwrap_or(BoundaryPlan {
                from: Tier::Gs,
                to: Tier::Fs,
                varyings: Vec::new(),
            });

        let mut doc = String::from("#version 440\n\n");
        doc.push_str("layout(triangles) in;\n");
        doc.push_str("layout(triangle_strip, max_vertices = 3) out;\n");

        if !incoming.varyings.is_empty() || !outgoing.varyings.is_empty() {
            doc.push('\n');
        }
        for v in &incoming.varyings {
            let name = self.varying_in_name(incoming.from, incoming.to, v);
            let wire = self.wire_type_spelling(v.var)?;
            doc.push_str(&format!(
                "layout(location = {}) {}in {wire} {name}[];\n",
                v.location,
                Self::qualifier_text(v.interpolation)
            ));
        }
        for v in &outgoing.varyings {
            let name = self.varying_in_name(outgoing.from, outgoing.to, v);
            let wire = self.wire_type_spelling(v.var)?;
            doc.push_str(&format!(
                "layout(location = {}) {}out {wire} {name};\n",
                v.location,
                Self::qualifier_text(v.interpolation)
            ));
        }

        doc.push_str("\nvoid main() {\n");
        doc.push_str("    for (int i = 0; i < 3; ++i) {\n");
        doc.push_str("        gl_Position = gl_in[i].gl_Position;\n");
        for v in &outgoing.varyings {
            let out_name = self.varying_in_name(outgoing.from, outgoing.to, v);
            let in_v = incoming
                .varyings
                .iter()
                .find(|iv| iv.var == v.var)
                .ok_or_else(|| {
                    glslice_partition::PartitionError::Internal(format!(
                        "geometry stage forwards `{}` without receiving it",
                        v.ident
                    ))
                })?;
            let in_name = self.varying_in_name(incoming.from, incoming.to, in_v);
            doc.push_str(&format!("        {out_name} = {in_name}[i];\n"));
        }
        doc.push_str("        EmitVertex();\n");
        doc.push_str("    }\n");
        doc.push_str("    EndPrimitive();\n");
        doc.push_str("}\n");
        Ok(doc)
    }

    // ---- structs ----

    fn structs_used(&self, body: &[usize]) -> Result<Vec<Handle<Type>>, CompileError> {
        let mut tys: BTreeSet<Handle<Type>> = BTreeSet::new();
        let mut stack: Vec<Handle<Expr>> = Vec::new();
        for &i in body {
            collect_stmt_exprs(&self.program.body[i], &mut stack);
            if let Stmt::Local { var, .. } = &self.program.body[i] {
                tys.insert(self.program.symbols[*var].ty);
            }
        }
        while let Some(h) = stack.pop() {
            tys.insert(self.program.exprs[h].ty);
            collect_expr_children(self.program, h, &mut stack);
        }

        let mut structs: Vec<Handle<Type>> = tys
            .into_iter()
            .filter(|&t| {
                matches!(
                    &self.program.types[t].inner,
                    TypeInner::Struct { members } if !members.is_empty()
                )
            })
            .collect();
        structs.sort();
        Ok(structs)
    }

    fn struct_decl(&self, ty: Handle<Type>) -> Result<String, CompileError> {
        let t = &self.program.types[ty];
        let name = t.name.clone().ok_or_else(|| {
            CompileError::from(glslice_ast::TypeError::NotRepresentable(
                "anonymous struct".into(),
            ))
        })?;
        let TypeInner::Struct { members } = &t.inner else {
            return Err(glslice_partition::PartitionError::Internal(
                "struct_decl on a non-struct type".into(),
            )
            .into());
        };
        let mut out = format!("struct {name} {{\n");
        for m in members {
            let decl = self.declaration(m.ty, &sanitize(&m.name))?;
            out.push_str(&format!("    {decl};\n"));
        }
        out.push_str("};\n");
        Ok(out)
    }
}

fn env_or_global_read(
    env_reads: &BTreeSet<VarId>,
    global_reads: &BTreeSet<VarId>,
    var: VarId,
) -> bool {
    env_reads.contains(&var) || global_reads.contains(&var)
}

/// Pushes the expression handles a statement owns onto the stack.
fn collect_stmt_exprs(stmt: &Stmt, stack: &mut Vec<Handle<Expr>>) {
    match stmt {
        Stmt::Assign { lhs, rhs, .. } => {
            stack.push(*lhs);
            stack.push(*rhs);
        }
        Stmt::Local { init, .. } => {
            if let Some(init) = init {
                stack.push(*init);
            }
        }
        Stmt::If {
            condition,
            accept,
            reject,
        } => {
            stack.push(*condition);
            for s in accept.iter().chain(reject.iter()) {
                collect_stmt_exprs(s, stack);
            }
        }
        Stmt::ForRange {
            start, end, body, ..
        } => {
            stack.push(*start);
            stack.push(*end);
            for s in body {
                collect_stmt_exprs(s, stack);
            }
        }
        Stmt::ForEach { array, body, .. } => {
            stack.push(*array);
            for s in body {
                collect_stmt_exprs(s, stack);
            }
        }
        Stmt::While { condition, body } => {
            stack.push(*condition);
            for s in body {
                collect_stmt_exprs(s, stack);
            }
        }
        Stmt::Return { value } => {
            if let Some(value) = value {
                stack.push(*value);
            }
        }
        Stmt::Expr(e) => stack.push(*e),
        Stmt::Interpolate { .. } => {}
    }
}

/// Pushes an expression's children onto the stack.
fn collect_expr_children(program: &Program, handle: Handle<Expr>, stack: &mut Vec<Handle<Expr>>) {
    match &program.exprs[handle].kind {
        ExprKind::Literal(_) | ExprKind::SymbolRef(_) => {}
        ExprKind::Member { base, .. } | ExprKind::Swizzle { base, .. } => stack.push(*base),
        ExprKind::Index { base, index } => {
            stack.push(*base);
            stack.push(*index);
        }
        ExprKind::Unary { expr, .. } => stack.push(*expr),
        ExprKind::Binary { left, right, .. } => {
            stack.push(*left);
            stack.push(*right);
        }
        ExprKind::Select {
            condition,
            accept,
            reject,
        } => {
            stack.push(*condition);
            stack.push(*accept);
            stack.push(*reject);
        }
        ExprKind::Call { args, .. } => stack.extend(args.iter().copied()),
    }
}
