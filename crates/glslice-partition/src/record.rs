//! Read/write sets and tier hints per statement.
//!
//! One walk over the statement list produces a [`StmtFacts`] record for
//! every top-level statement: which partition-visible locations it reads
//! and writes, the static tier floor implied by the expressions it
//! contains, and any forced write-site tier. Nested blocks fold into the
//! enclosing statement; the top level stays straight-line, which keeps
//! the dependency graph acyclic by construction.

use std::collections::{BTreeMap, BTreeSet};

use glslice_ast::{
    BuiltinVar, Callee, ExprKind, GlobalClass, Handle, Interpolation, ProcDef, Program, Stmt,
    Symbol, SymbolKind, TypeInner,
};

use crate::error::PartitionError;
use crate::tier::{PipelineConfig, Tier};

/// A partition-visible storage location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VarId {
    /// A symbol: local, parameter, global, or flattened interface field.
    Sym(Handle<Symbol>),
    /// A pipeline builtin.
    Builtin(BuiltinVar),
}

impl VarId {
    /// A user-facing name for error messages; interface fields carry
    /// their receiver (`result.color`).
    pub fn describe(&self, program: &Program) -> String {
        match self {
            Self::Sym(h) => {
                let sym = &program.symbols[*h];
                match sym.parent {
                    Some(parent) => {
                        format!("{}.{}", program.symbols[parent].name, sym.name)
                    }
                    None => sym.name.clone(),
                }
            }
            Self::Builtin(b) => b.glsl_name().to_string(),
        }
    }
}

/// The tier at which a never-written global's value originates.
pub fn class_tier(class: GlobalClass) -> Option<Tier> {
    match class {
        GlobalClass::ModuleConst => Some(Tier::Const),
        GlobalClass::CpuDynamic => Some(Tier::Cpu),
        GlobalClass::Attribute { .. } => Some(Tier::Vs),
        GlobalClass::Sampler => None,
        GlobalClass::FragOutput { .. } => None,
        GlobalClass::Builtin(BuiltinVar::Position) => None,
        GlobalClass::Builtin(BuiltinVar::FragCoord) => Some(Tier::Fs),
    }
}

/// Facts about one top-level statement.
#[derive(Clone, Debug)]
pub struct StmtFacts {
    /// Static tier floor from expression hints (literals, global classes,
    /// texture sampling, builtins).
    pub hint: Tier,
    /// Reads of locations whose value tier depends on preceding writes.
    pub env_reads: BTreeSet<VarId>,
    /// Reads of never-written globals (constants, uniforms, attributes,
    /// samplers, `gl_FragCoord`), including those reached through
    /// procedure calls.
    pub global_reads: BTreeSet<VarId>,
    /// Locations written by this statement.
    pub writes: BTreeSet<VarId>,
    /// Writes that merge with the previous value: swizzle or index
    /// stores, compound assignments, and writes under control flow.
    pub partial_writes: BTreeSet<VarId>,
    /// An exact execution tier demanded by the write site
    /// (`gl_Position` pins its statement to VS).
    pub forced: Option<Tier>,
    /// For `interpolate` directives: the target and requested qualifier.
    pub interp: Option<(VarId, Option<Interpolation>)>,
}

impl StmtFacts {
    fn new() -> Self {
        Self {
            hint: Tier::Const,
            env_reads: BTreeSet::new(),
            global_reads: BTreeSet::new(),
            writes: BTreeSet::new(),
            partial_writes: BTreeSet::new(),
            forced: None,
            interp: None,
        }
    }

    /// Returns `true` for `interpolate` directives, which direct the
    /// planner but execute nowhere.
    pub fn is_directive(&self) -> bool {
        self.interp.is_some()
    }
}

#[derive(Clone, Debug)]
struct ProcFacts {
    hint: Tier,
    global_reads: BTreeSet<VarId>,
}

/// Collects [`StmtFacts`] for every top-level statement.
pub fn collect(program: &Program, config: &PipelineConfig) -> Result<Vec<StmtFacts>, PartitionError> {
    let mut collector = Collector {
        program,
        texture_tier: if config.vertex_texture_fetch {
            Tier::Vs
        } else {
            Tier::Fs
        },
        proc_facts: BTreeMap::new(),
        proc_stack: Vec::new(),
    };

    program
        .body
        .iter()
        .map(|stmt| {
            let mut facts = StmtFacts::new();
            collector.visit_stmt(stmt, &mut facts, false)?;
            Ok(facts)
        })
        .collect()
}

struct Collector<'a> {
    program: &'a Program,
    texture_tier: Tier,
    proc_facts: BTreeMap<Handle<ProcDef>, ProcFacts>,
    proc_stack: Vec<Handle<ProcDef>>,
}

impl<'a> Collector<'a> {
    fn unsupported(&self, detail: impl Into<String>) -> PartitionError {
        PartitionError::UnsupportedConstruct {
            detail: detail.into(),
            loc: None,
        }
    }

    fn visit_stmt(
        &mut self,
        stmt: &Stmt,
        facts: &mut StmtFacts,
        conditional: bool,
    ) -> Result<(), PartitionError> {
        match stmt {
            Stmt::Assign { lhs, op, rhs } => {
                self.read_expr(*rhs, facts)?;
                let (var, partial) = self.write_site(*lhs, facts)?;
                facts.writes.insert(var);
                if partial || op.is_some() || conditional {
                    facts.partial_writes.insert(var);
                    // Merging writes observe the previous value.
                    self.note_read(var, facts);
                }
                if var == VarId::Builtin(BuiltinVar::Position) {
                    facts.forced = Some(Tier::Vs);
                }
            }
            Stmt::Local { var, init } => {
                if let Some(init) = init {
                    self.read_expr(*init, facts)?;
                }
                facts.writes.insert(VarId::Sym(*var));
                if conditional {
                    facts.partial_writes.insert(VarId::Sym(*var));
                }
            }
            Stmt::If {
                condition,
                accept,
                reject,
            } => {
                self.read_expr(*condition, facts)?;
                for nested in accept.iter().chain(reject.iter()) {
                    self.visit_stmt(nested, facts, true)?;
                }
            }
            Stmt::ForRange {
                var,
                start,
                end,
                body,
            } => {
                self.read_expr(*start, facts)?;
                self.read_expr(*end, facts)?;
                facts.writes.insert(VarId::Sym(*var));
                for nested in body {
                    self.visit_stmt(nested, facts, true)?;
                }
            }
            Stmt::ForEach { var, array, body } => {
                let array_ty = self.program.exprs[*array].ty;
                if !matches!(
                    self.program.types[array_ty].inner,
                    TypeInner::Array { .. }
                ) {
                    return Err(self.unsupported("items() iteration over a non-array value"));
                }
                self.read_expr(*array, facts)?;
                facts.writes.insert(VarId::Sym(*var));
                for nested in body {
                    self.visit_stmt(nested, facts, true)?;
                }
            }
            Stmt::While { condition, body } => {
                self.read_expr(*condition, facts)?;
                for nested in body {
                    self.visit_stmt(nested, facts, true)?;
                }
            }
            Stmt::Return { value } => {
                if let Some(value) = value {
                    self.read_expr(*value, facts)?;
                }
            }
            Stmt::Expr(e) => self.read_expr(*e, facts)?,
            Stmt::Interpolate { target, qualifier } => {
                let var = self.interpolate_target(*target)?;
                facts.interp = Some((var, *qualifier));
            }
        }
        Ok(())
    }

    /// Validates an `interpolate` target: a whole variable of scalar or
    /// vector type, never a swizzle or component.
    fn interpolate_target(&self, target: Handle<glslice_ast::Expr>) -> Result<VarId, PartitionError> {
        let expr = &self.program.exprs[target];
        let bad = |detail: &str| PartitionError::BadInterpolate {
            detail: detail.to_string(),
            loc: expr.loc,
        };

        let var = match &expr.kind {
            ExprKind::SymbolRef(sym) => {
                let s = &self.program.symbols[*sym];
                match (s.kind, s.class) {
                    (SymbolKind::Local, None) => VarId::Sym(*sym),
                    (_, Some(GlobalClass::FragOutput { .. })) => VarId::Sym(*sym),
                    _ => return Err(bad(&format!("`{}`", s.name))),
                }
            }
            ExprKind::Member { field, .. } => {
                let f = &self.program.symbols[*field];
                match f.class {
                    Some(GlobalClass::FragOutput { .. }) => VarId::Sym(*field),
                    _ => return Err(bad("a record component")),
                }
            }
            ExprKind::Swizzle { .. } => return Err(bad("a swizzle")),
            ExprKind::Index { .. } => return Err(bad("an indexed element")),
            _ => return Err(bad("an expression")),
        };

        let ty = expr.ty;
        match self.program.types[ty].inner {
            TypeInner::Scalar(_) | TypeInner::Vector { .. } => Ok(var),
            _ => Err(bad("a non-scalar, non-vector value")),
        }
    }

    /// Records a read of a resolved location.
    fn note_read(&self, var: VarId, facts: &mut StmtFacts) {
        match var {
            VarId::Builtin(BuiltinVar::FragCoord) => {
                facts.global_reads.insert(var);
                facts.hint = facts.hint.join(Tier::Fs);
            }
            VarId::Builtin(BuiltinVar::Position) => {
                facts.env_reads.insert(var);
            }
            VarId::Sym(h) => {
                let sym = &self.program.symbols[h];
                match sym.class {
                    None => {
                        facts.env_reads.insert(var);
                    }
                    Some(GlobalClass::FragOutput { .. }) => {
                        facts.env_reads.insert(var);
                    }
                    Some(class) => {
                        facts.global_reads.insert(var);
                        if let Some(tier) = class_tier(class) {
                            facts.hint = facts.hint.join(tier);
                        }
                    }
                }
            }
        }
    }

    /// Walks an expression as a read, accumulating facts.
    fn read_expr(
        &mut self,
        handle: Handle<glslice_ast::Expr>,
        facts: &mut StmtFacts,
    ) -> Result<(), PartitionError> {
        let expr = &self.program.exprs[handle];
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::SymbolRef(sym) => {
                let s = &self.program.symbols[*sym];
                match (s.kind, s.class) {
                    (SymbolKind::Proc, _) => {
                        return Err(self.unsupported(format!(
                            "procedure `{}` referenced as a value",
                            s.name
                        )))
                    }
                    (SymbolKind::Result, None) => {
                        return Err(self.unsupported(format!(
                            "record `{}` used as a value",
                            s.name
                        )))
                    }
                    (_, Some(GlobalClass::Builtin(b))) => self.note_read(VarId::Builtin(b), facts),
                    _ => self.note_read(VarId::Sym(*sym), facts),
                }
            }
            ExprKind::Member { base, field } => {
                let f = &self.program.symbols[*field];
                match f.class {
                    Some(GlobalClass::Attribute { .. }) | Some(GlobalClass::FragOutput { .. }) => {
                        // Interface field: the receiver is syntax, not data.
                        self.note_read(VarId::Sym(*field), facts);
                    }
                    _ => self.read_expr(*base, facts)?,
                }
            }
            ExprKind::Swizzle { base, .. } => self.read_expr(*base, facts)?,
            ExprKind::Index { base, index } => {
                self.read_expr(*base, facts)?;
                self.read_expr(*index, facts)?;
            }
            ExprKind::Unary { expr, .. } => self.read_expr(*expr, facts)?,
            ExprKind::Binary { op, left, right } => {
                if op.is_comparison() {
                    let lt = self.program.exprs[*left].ty;
                    let rt = self.program.exprs[*right].ty;
                    let scalar = |ty| {
                        matches!(self.program.types[ty].inner, TypeInner::Scalar(_))
                    };
                    if !scalar(lt) || !scalar(rt) {
                        return Err(self.unsupported(
                            "comparison against a non-scalar value; select a component first",
                        ));
                    }
                }
                self.read_expr(*left, facts)?;
                self.read_expr(*right, facts)?;
            }
            ExprKind::Select {
                condition,
                accept,
                reject,
            } => {
                self.read_expr(*condition, facts)?;
                self.read_expr(*accept, facts)?;
                self.read_expr(*reject, facts)?;
            }
            ExprKind::Call { callee, args } => {
                match callee {
                    Callee::Texture => {
                        let sampler = args.first().copied().ok_or_else(|| {
                            self.unsupported("texture() with no sampler argument")
                        })?;
                        match &self.program.exprs[sampler].kind {
                            ExprKind::SymbolRef(sym)
                                if self.program.symbols[*sym].class
                                    == Some(GlobalClass::Sampler) =>
                            {
                                facts.global_reads.insert(VarId::Sym(*sym));
                            }
                            _ => {
                                return Err(self.unsupported(
                                    "texture() requires a sampler global as its first argument",
                                ))
                            }
                        }
                        facts.hint = facts.hint.join(self.texture_tier);
                        for arg in &args[1..] {
                            self.read_expr(*arg, facts)?;
                        }
                    }
                    Callee::Proc(proc) => {
                        let pf = self.analyze_proc(*proc)?;
                        facts.hint = facts.hint.join(pf.hint);
                        facts.global_reads.extend(pf.global_reads.iter().copied());
                        for arg in args {
                            self.read_expr(*arg, facts)?;
                        }
                    }
                    Callee::Math(_) | Callee::Construct(_) => {
                        for arg in args {
                            self.read_expr(*arg, facts)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves an assignment target to its storage location.
    ///
    /// Subscript reads (index expressions) are recorded as reads; the
    /// base variable itself is returned with a partial-write flag for
    /// swizzle, index, and struct-member stores.
    fn write_site(
        &mut self,
        handle: Handle<glslice_ast::Expr>,
        facts: &mut StmtFacts,
    ) -> Result<(VarId, bool), PartitionError> {
        let expr = &self.program.exprs[handle];
        match &expr.kind {
            ExprKind::SymbolRef(sym) => {
                let s = &self.program.symbols[*sym];
                match (s.kind, s.class) {
                    (SymbolKind::Local | SymbolKind::Param, None) => Ok((VarId::Sym(*sym), false)),
                    (_, Some(GlobalClass::FragOutput { .. })) => Ok((VarId::Sym(*sym), false)),
                    (_, Some(GlobalClass::Builtin(BuiltinVar::Position))) => {
                        Ok((VarId::Builtin(BuiltinVar::Position), false))
                    }
                    (_, Some(GlobalClass::Builtin(BuiltinVar::FragCoord))) => {
                        Err(self.unsupported("cannot assign to gl_FragCoord"))
                    }
                    (_, Some(GlobalClass::Attribute { .. })) => Err(self.unsupported(format!(
                        "cannot assign to vertex attribute `{}`",
                        s.name
                    ))),
                    _ => Err(self.unsupported(format!("cannot assign to `{}`", s.name))),
                }
            }
            ExprKind::Member { base, field } => {
                let f = &self.program.symbols[*field];
                match f.class {
                    Some(GlobalClass::FragOutput { .. }) => Ok((VarId::Sym(*field), false)),
                    Some(GlobalClass::Attribute { .. }) => Err(self.unsupported(format!(
                        "cannot assign to vertex attribute `{}`",
                        f.name
                    ))),
                    _ => {
                        let (var, _) = self.write_site(*base, facts)?;
                        Ok((var, true))
                    }
                }
            }
            ExprKind::Swizzle { base, .. } => {
                let (var, _) = self.write_site(*base, facts)?;
                Ok((var, true))
            }
            ExprKind::Index { base, index } => {
                self.read_expr(*index, facts)?;
                let (var, _) = self.write_site(*base, facts)?;
                Ok((var, true))
            }
            _ => Err(self.unsupported("assignment target is not an lvalue")),
        }
    }

    /// Computes the intrinsic tier and global read set of a procedure,
    /// memoized per compile.
    fn analyze_proc(&mut self, proc: Handle<ProcDef>) -> Result<ProcFacts, PartitionError> {
        if let Some(pf) = self.proc_facts.get(&proc) {
            return Ok(pf.clone());
        }
        if self.proc_stack.contains(&proc) {
            let name = &self.program.symbols[self.program.procs[proc].sym].name;
            return Err(self.unsupported(format!("recursive procedure `{name}`")));
        }

        self.proc_stack.push(proc);
        let mut facts = StmtFacts::new();
        let body = self.program.procs[proc].body.clone();
        for stmt in &body {
            self.visit_stmt(stmt, &mut facts, false)?;
        }
        self.proc_stack.pop();

        // Procedures touch the pipeline interface only through their
        // parameters; interface reads inside a body would not survive the
        // partition.
        for var in &facts.env_reads {
            match var {
                VarId::Builtin(BuiltinVar::Position) => {
                    return Err(self.unsupported("procedure body reads gl_Position"))
                }
                VarId::Builtin(BuiltinVar::FragCoord) => {
                    return Err(self.unsupported("procedure body reads gl_FragCoord"))
                }
                VarId::Sym(h) => {
                    let s = &self.program.symbols[*h];
                    if matches!(s.class, Some(GlobalClass::FragOutput { .. })) {
                        return Err(self.unsupported(format!(
                            "procedure body accesses pipeline output `{}`",
                            s.name
                        )));
                    }
                }
            }
        }
        for var in &facts.global_reads {
            if let VarId::Sym(h) = var {
                let s = &self.program.symbols[*h];
                if matches!(s.class, Some(GlobalClass::Attribute { .. })) {
                    return Err(self.unsupported(format!(
                        "procedure body reads vertex attribute `{}`",
                        s.name
                    )));
                }
            }
        }

        let pf = ProcFacts {
            hint: facts.hint,
            global_reads: facts.global_reads,
        };
        self.proc_facts.insert(proc, pf.clone());
        Ok(pf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslice_ast::builder::ProgramBuilder;
    use glslice_ast::SamplerDim;

    #[test]
    fn texture_read_hints_fs() {
        let mut b = ProgramBuilder::new();
        let tex = b.texture_uniform("myTex", SamplerDim::D2);
        let v2 = b.ty_vec2();
        let uv = b.vertex_input("texcoord", v2);
        let v4 = b.ty_vec4();
        let color = b.fragment_output("color", v4);
        let uv_ref = b.input(uv);
        let sample = b.texture(tex, uv_ref);
        let lhs = b.output(color);
        let stmt = b.assign(lhs, sample);
        b.push(stmt);
        let program = b.finish();

        let facts = collect(&program, &PipelineConfig::default()).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].hint, Tier::Fs);
        assert_eq!(facts[0].writes.len(), 1);
        assert!(facts[0].global_reads.len() >= 2); // sampler + attribute
    }

    #[test]
    fn vertex_texture_fetch_lowers_the_hint() {
        let mut b = ProgramBuilder::new();
        let tex = b.texture_uniform("heightMap", SamplerDim::D2);
        let v2 = b.ty_vec2();
        let uv = b.vertex_input("texcoord", v2);
        let v4 = b.ty_vec4();
        let color = b.fragment_output("color", v4);
        let uv_ref = b.input(uv);
        let sample = b.texture(tex, uv_ref);
        let lhs = b.output(color);
        let stmt = b.assign(lhs, sample);
        b.push(stmt);
        let program = b.finish();

        let config = PipelineConfig {
            vertex_texture_fetch: true,
            ..Default::default()
        };
        let facts = collect(&program, &config).unwrap();
        assert_eq!(facts[0].hint, Tier::Vs);
    }

    #[test]
    fn compound_assignment_reads_its_target() {
        let mut b = ProgramBuilder::new();
        let v4 = b.ty_vec4();
        let color = b.fragment_output("color", v4);
        let lhs = b.output(color);
        let lhs_r = b.swizzle(lhs, "r");
        let rhs = b.lit_f32(0.5);
        let stmt = b.compound(lhs_r, glslice_ast::BinaryOp::Add, rhs);
        b.push(stmt);
        let program = b.finish();

        let facts = collect(&program, &PipelineConfig::default()).unwrap();
        let var = *facts[0].writes.iter().next().unwrap();
        assert!(facts[0].env_reads.contains(&var));
        assert!(facts[0].partial_writes.contains(&var));
    }

    #[test]
    fn position_write_is_pinned_to_vs() {
        let mut b = ProgramBuilder::new();
        let m4 = b.ty_mat4();
        let mvp = b.uniform("mvp", m4);
        let v4 = b.ty_vec4();
        let pos = b.vertex_input("position", v4);
        let m = b.read(mvp);
        let p = b.input(pos);
        let rhs = b.mul(m, p);
        let lhs = b.position();
        let stmt = b.assign(lhs, rhs);
        b.push(stmt);
        let program = b.finish();

        let facts = collect(&program, &PipelineConfig::default()).unwrap();
        assert_eq!(facts[0].forced, Some(Tier::Vs));
        assert_eq!(facts[0].hint, Tier::Vs); // attribute read
        assert!(facts[0]
            .writes
            .contains(&VarId::Builtin(BuiltinVar::Position)));
    }

    #[test]
    fn interpolate_on_a_swizzle_is_rejected() {
        let mut b = ProgramBuilder::new();
        let v4 = b.ty_vec4();
        let color = b.fragment_output("color", v4);
        let e = b.output(color);
        let r = b.swizzle(e, "r");
        let stmt = b.interpolate(r, None);
        b.push(stmt);
        let program = b.finish();

        let err = collect(&program, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PartitionError::BadInterpolate { .. }));
    }

    #[test]
    fn foreach_requires_an_array() {
        let mut b = ProgramBuilder::new();
        let v4 = b.ty_vec4();
        let color = b.fragment_output("color", v4);
        let f = b.ty_f32();
        let item = b.local("item", f);
        let arr = b.output(color); // a vec4, not an array
        let stmt = b.for_each(item, arr, Vec::new());
        b.push(stmt);
        let program = b.finish();

        let err = collect(&program, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PartitionError::UnsupportedConstruct { .. }));
    }
}
