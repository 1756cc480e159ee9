//! The partitioner: assigns a tier to every statement, validates the
//! assignment against the dependency lattice, reorders statements into
//! tier-grouped runs, and resolves multi-stage symbol conflicts.

use std::collections::{BTreeMap, BTreeSet};

use glslice_ast::{
    BuiltinVar, DiagKind, Diagnostic, Diagnostics, GlobalClass, Interpolation, Program, Stmt,
};

use crate::depgraph::DependencyGraph;
use crate::error::PartitionError;
use crate::record::{class_tier, collect, StmtFacts, VarId};
use crate::tier::{PipelineConfig, StageSet, Tier};

/// A value delivery between tiers: the value of `var` produced at `from`
/// is consumed at `to`. Deliveries from `Const`/`Cpu` become uniforms;
/// deliveries between shader stages become varyings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Crossing {
    pub var: VarId,
    pub from: Tier,
    pub to: Tier,
}

/// The result of partitioning: a total tier assignment, the reordered
/// execution sequence, liveness, and every cross-tier value delivery.
#[derive(Clone, Debug)]
pub struct PartitionPlan {
    pub stages: StageSet,
    /// `stmt_index → tier`, total over the body (directives sit at CONST).
    pub tiers: Vec<Tier>,
    /// Executable statements in tier-grouped, dependency-respecting order.
    pub order: Vec<usize>,
    /// Per-statement liveness; dead statements stay in the plan but are
    /// not emitted.
    pub live: Vec<bool>,
    /// Every cross-tier value delivery the emitters must realize.
    pub crossings: BTreeSet<Crossing>,
    /// Symbols under a whole-symbol `interpolate` override.
    pub interpolated: BTreeMap<VarId, Option<Interpolation>>,
    /// Final value tier of every written location, over live writes.
    pub final_tier: BTreeMap<VarId, Tier>,
    /// Per-statement facts, kept for the emitters.
    pub facts: Vec<StmtFacts>,
}

impl PartitionPlan {
    /// Executable statement indices assigned to one tier, in execution
    /// order, dead statements excluded.
    pub fn stage_body(&self, tier: Tier) -> Vec<usize> {
        self.order
            .iter()
            .copied()
            .filter(|&i| self.tiers[i] == tier && self.live[i])
            .collect()
    }

    /// The crossing that delivers `var` into `to`, if any.
    pub fn incoming(&self, var: VarId, to: Tier) -> Option<Crossing> {
        self.crossings
            .iter()
            .copied()
            .find(|c| c.var == var && c.to == to)
    }
}

/// The default value tier of a location that is read before any write.
fn default_tier(program: &Program, var: VarId) -> Option<Tier> {
    match var {
        // gl_Position lives in the vertex stage.
        VarId::Builtin(BuiltinVar::Position) => Some(Tier::Vs),
        VarId::Builtin(BuiltinVar::FragCoord) => Some(Tier::Fs),
        VarId::Sym(h) => match program.symbols[h].class {
            // Pipeline outputs are zero-initialized.
            Some(GlobalClass::FragOutput { .. }) => Some(Tier::Const),
            _ => None,
        },
    }
}

/// Partitions a program: tier inference, conflict resolution, reordering,
/// liveness, and crossing computation.
pub fn partition(
    program: &Program,
    config: &PipelineConfig,
    diags: &mut Diagnostics,
) -> Result<PartitionPlan, PartitionError> {
    let stages = StageSet::from_config(config);
    let facts = collect(program, config)?;
    let n = facts.len();

    // Interpolate directives collapse conflicts for their whole symbol.
    let mut interpolated: BTreeMap<VarId, Option<Interpolation>> = BTreeMap::new();
    for f in &facts {
        if let Some((var, qualifier)) = f.interp {
            interpolated.insert(var, qualifier);
        }
    }

    // Tier inference: one forward pass over the straight-line body.
    // `env` tracks the value tier each location holds at the current
    // point in source order; a statement's tier is the join of its static
    // hint and the tiers of the values it reads.
    let mut env: BTreeMap<VarId, Tier> = BTreeMap::new();
    let mut tiers = vec![Tier::Const; n];
    // One env read: statement, location, source tier, reader tier, and
    // whether the source was the never-written default value.
    struct ReadEvent {
        stmt: usize,
        var: VarId,
        source: Tier,
        reader: Tier,
        from_default: bool,
    }
    let mut read_events: Vec<ReadEvent> = Vec::new();

    for (i, f) in facts.iter().enumerate() {
        if f.is_directive() {
            continue;
        }

        let mut tier = f.hint;
        let mut sources: Vec<(VarId, Tier, bool)> = Vec::new();
        for &var in &f.env_reads {
            let (source, from_default) = match env.get(&var).copied() {
                Some(t) => (t, false),
                None => match default_tier(program, var) {
                    Some(t) => (t, true),
                    None => {
                        return Err(PartitionError::UnknownIdentifier {
                            name: var.describe(program),
                            loc: None,
                        })
                    }
                },
            };
            sources.push((var, source, from_default));
            if !interpolated.contains_key(&var) {
                tier = tier.join(source);
            } else if f.forced.is_none() {
                // Reading an interpolated symbol consumes the varying's
                // fragment-side value; only a pinned write site (such as
                // gl_Position) binds the reader's stage-local instance
                // instead.
                tier = tier.join(Tier::Fs);
            }
        }

        if let Some(forced) = f.forced {
            if tier > forced {
                // A pinned write site is consuming a value that only
                // exists at a later stage.
                let (name, written) = sources
                    .iter()
                    .find(|&&(var, src, _)| src > forced && !interpolated.contains_key(&var))
                    .map(|&(var, src, _)| (var.describe(program), src))
                    .unwrap_or_else(|| {
                        let written_var = f.writes.iter().next();
                        (
                            written_var
                                .map(|v| v.describe(program))
                                .unwrap_or_else(|| "value".to_string()),
                            tier,
                        )
                    });
                return Err(PartitionError::StageSplitConflict {
                    name,
                    written,
                    read: forced,
                    loc: None,
                });
            }
            tier = forced;
        }

        tiers[i] = tier;
        for (var, source, from_default) in sources {
            read_events.push(ReadEvent {
                stmt: i,
                var,
                source,
                reader: tier,
                from_default,
            });
        }

        for &w in &f.writes {
            let value_tier = if f.partial_writes.contains(&w) {
                env.get(&w)
                    .copied()
                    .or_else(|| default_tier(program, w))
                    .unwrap_or(Tier::Const)
                    .join(tier)
            } else {
                tier
            };
            env.insert(w, value_tier);
        }
    }

    // Reorder into tier-grouped runs; fails with a stage-order conflict
    // when some dependency pins a lower-tier statement after a higher one.
    let graph = DependencyGraph::build(&facts, &tiers, &interpolated);
    let order = graph.tier_schedule(&tiers)?;

    // Dead-code elimination: a statement is live when a pipeline output
    // transitively depends on one of its writes. Writes never kill the
    // needed set, which keeps partial and conditional writes safe.
    let mut needed: BTreeSet<VarId> = BTreeSet::new();
    needed.insert(VarId::Builtin(BuiltinVar::Position));
    for (h, sym) in program.symbols.iter() {
        if matches!(sym.class, Some(GlobalClass::FragOutput { .. })) {
            needed.insert(VarId::Sym(h));
        }
    }
    let mut live = vec![false; n];
    for &i in order.iter().rev() {
        let f = &facts[i];
        let is_live = matches!(program.body[i], Stmt::Return { .. })
            || f.writes.iter().any(|w| needed.contains(w));
        if is_live {
            live[i] = true;
            needed.extend(f.env_reads.iter().copied());
            needed.extend(f.global_reads.iter().copied());
        }
    }
    for &i in &order {
        if !live[i] {
            let diag = Diagnostic::warning(
                DiagKind::DeadCode,
                format!("statement {i} has no effect on any pipeline output"),
            );
            log::warn!("{diag}");
            diags.push(diag);
        }
    }

    // Final value tiers over live writes only.
    let mut final_tier: BTreeMap<VarId, Tier> = BTreeMap::new();
    for &i in &order {
        if !live[i] {
            continue;
        }
        for &w in &facts[i].writes {
            let t = final_tier
                .get(&w)
                .copied()
                .map_or(tiers[i], |prev| prev.join(tiers[i]));
            final_tier.insert(w, t);
        }
    }

    // Cross-tier deliveries.
    let mut crossings: BTreeSet<Crossing> = BTreeSet::new();

    // Reads whose source tier lies below the reading statement. Reads of
    // a never-written default (a zero-initialized output) stay local to
    // the reading stage; there is no value to deliver.
    for ev in &read_events {
        if !live[ev.stmt] || ev.from_default || interpolated.contains_key(&ev.var) {
            continue;
        }
        if ev.source < ev.reader && ev.reader.is_shader_stage() {
            crossings.insert(Crossing {
                var: ev.var,
                from: ev.source,
                to: ev.reader,
            });
        }
    }

    // Never-written globals read by shader-stage statements.
    for (i, f) in facts.iter().enumerate() {
        if !live[i] || !tiers[i].is_shader_stage() {
            continue;
        }
        for &g in &f.global_reads {
            let class = match g {
                VarId::Sym(h) => program.symbols[h].class,
                VarId::Builtin(b) => Some(GlobalClass::Builtin(b)),
            };
            let Some(class) = class else { continue };
            let Some(from) = class_tier(class) else {
                continue; // samplers bind per stage, they do not cross
            };
            if from < tiers[i] {
                crossings.insert(Crossing {
                    var: g,
                    from,
                    to: tiers[i],
                });
            }
        }
    }

    // The final value of every fragment output is consumed at FS.
    for (&var, &t) in &final_tier {
        if interpolated.contains_key(&var) {
            continue;
        }
        if let VarId::Sym(h) = var {
            if matches!(
                program.symbols[h].class,
                Some(GlobalClass::FragOutput { .. })
            ) && t < Tier::Fs
            {
                crossings.insert(Crossing {
                    var,
                    from: t,
                    to: Tier::Fs,
                });
            }
        }
    }

    // Interpolated symbols: stage-local instances stitched by a forced
    // vertex-to-fragment varying; any CPU-side portion seeds the vertex
    // instance as a uniform.
    for (&var, _) in &interpolated {
        let involved = final_tier.contains_key(&var)
            || read_events
                .iter()
                .any(|ev| ev.var == var && live[ev.stmt]);
        if !involved {
            let diag = Diagnostic::warning(
                DiagKind::UnusedInterpolate,
                format!(
                    "interpolate({}) has no effect: the symbol never crosses a stage boundary",
                    var.describe(program)
                ),
            );
            log::warn!("{diag}");
            diags.push(diag);
            continue;
        }
        crossings.insert(Crossing {
            var,
            from: Tier::Vs,
            to: Tier::Fs,
        });
        if let Some(&t) = final_tier.get(&var) {
            if !t.is_shader_stage() {
                crossings.insert(Crossing {
                    var,
                    from: t,
                    to: Tier::Vs,
                });
            } else {
                // Seed from the highest CPU-side write, if any live
                // statement below VS writes the symbol.
                let cpu_seed = order
                    .iter()
                    .filter(|&&i| live[i] && !tiers[i].is_shader_stage())
                    .filter(|&&i| facts[i].writes.contains(&var))
                    .map(|&i| tiers[i])
                    .max();
                if let Some(seed) = cpu_seed {
                    crossings.insert(Crossing {
                        var,
                        from: seed,
                        to: Tier::Vs,
                    });
                }
            }
        }
    }

    // Attributes declared but never read.
    for (h, sym) in program.symbols.iter() {
        if !matches!(sym.class, Some(GlobalClass::Attribute { .. })) {
            continue;
        }
        let read = facts
            .iter()
            .enumerate()
            .any(|(i, f)| live[i] && f.global_reads.contains(&VarId::Sym(h)));
        if !read {
            let diag = Diagnostic::warning(
                DiagKind::UnusedAttribute,
                format!("vertex attribute `{}` is never read", sym.name),
            );
            log::warn!("{diag}");
            diags.push(diag);
        }
    }

    let per_tier = |t: Tier| order.iter().filter(|&&i| tiers[i] == t).count();
    log::debug!(
        "partitioned {} statements: {} const, {} cpu, {} vs, {} fs; {} crossings",
        order.len(),
        per_tier(Tier::Const),
        per_tier(Tier::Cpu),
        per_tier(Tier::Vs),
        per_tier(Tier::Fs),
        crossings.len(),
    );

    Ok(PartitionPlan {
        stages,
        tiers,
        order,
        live,
        crossings,
        interpolated,
        final_tier,
        facts,
    })
}
