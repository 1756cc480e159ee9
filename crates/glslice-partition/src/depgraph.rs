//! Def-use dependency graph over the top-level statement list.
//!
//! Edges are computed from read/write set intersections: RAW (true data
//! flow), WAR (anti), and WAW (output) dependencies. The graph is a DAG
//! by construction since the top level is straight-line code.

use std::collections::{BTreeMap, BTreeSet};

use glslice_ast::Interpolation;

use crate::error::PartitionError;
use crate::record::{StmtFacts, VarId};
use crate::tier::Tier;

/// The kind of dependency between two statements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyKind {
    /// Read-after-write: the consumer reads what the producer wrote.
    DataFlow,
    /// Write-after-read: the later statement overwrites a value the
    /// earlier one still needs.
    AntiDependency,
    /// Write-after-write to the same location.
    OutputDependency,
}

/// A dependency edge between two statement indices.
#[derive(Clone, Debug)]
pub struct DepEdge {
    pub from: usize,
    pub to: usize,
    pub kind: DependencyKind,
    pub var: VarId,
}

/// The dependency graph over executable top-level statements.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    /// Indices of executable statements (directives carry no node).
    nodes: Vec<usize>,
    edges: Vec<DepEdge>,
}

impl DependencyGraph {
    /// Builds the graph from per-statement facts.
    ///
    /// Edges between statements at *different* tiers are dropped for
    /// symbols under a whole-symbol `interpolate` override: their reads
    /// bind to the reader's stage-local instance, so the cross-stage
    /// ordering constraint disappears (the varying carries the value).
    pub fn build(
        facts: &[StmtFacts],
        tiers: &[Tier],
        interpolated: &BTreeMap<VarId, Option<Interpolation>>,
    ) -> Self {
        let nodes: Vec<usize> = facts
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_directive())
            .map(|(i, _)| i)
            .collect();

        let mut edges = Vec::new();
        let mut push = |from: usize, to: usize, kind: DependencyKind, var: VarId| {
            if interpolated.contains_key(&var) && tiers[from] != tiers[to] {
                return;
            }
            edges.push(DepEdge {
                from,
                to,
                kind,
                var,
            });
        };

        for (a, &i) in nodes.iter().enumerate() {
            for &j in nodes.iter().skip(a + 1) {
                for &w in &facts[i].writes {
                    if facts[j].env_reads.contains(&w) {
                        push(i, j, DependencyKind::DataFlow, w);
                    }
                    if facts[j].writes.contains(&w) {
                        push(i, j, DependencyKind::OutputDependency, w);
                    }
                }
                for &r in &facts[i].env_reads {
                    if facts[j].writes.contains(&r) {
                        push(i, j, DependencyKind::AntiDependency, r);
                    }
                }
            }
        }

        Self { nodes, edges }
    }

    /// The edges of this graph.
    pub fn edges(&self) -> &[DepEdge] {
        &self.edges
    }

    /// The number of executable statements.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Produces a total execution order that respects every edge and
    /// groups statements into contiguous runs of increasing tier.
    ///
    /// Kahn's algorithm with a ready set ordered by `(tier, source
    /// index)`: the lowest available tier always runs next, ties broken
    /// by original source position. If the resulting sequence is not
    /// monotone in tier, no tier-grouped order exists and the compile
    /// fails with a stage-order conflict.
    pub fn tier_schedule(&self, tiers: &[Tier]) -> Result<Vec<usize>, PartitionError> {
        let n = self.nodes.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let local: BTreeMap<usize, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(a, &i)| (i, a))
            .collect();

        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &self.edges {
            let from = local[&edge.from];
            let to = local[&edge.to];
            in_degree[to] += 1;
            successors[from].push(to);
        }

        let mut ready: BTreeSet<(Tier, usize)> = BTreeSet::new();
        for (a, &deg) in in_degree.iter().enumerate() {
            if deg == 0 {
                ready.insert((tiers[self.nodes[a]], self.nodes[a]));
            }
        }

        let mut order = Vec::with_capacity(n);
        while let Some(&(tier, stmt)) = ready.iter().next() {
            ready.remove(&(tier, stmt));
            if let Some(&prev) = order.last() {
                let prev_tier = tiers[prev];
                if tier < prev_tier {
                    return Err(PartitionError::StageOrderConflict {
                        earlier: prev,
                        earlier_tier: prev_tier,
                        later: stmt,
                        later_tier: tier,
                    });
                }
            }
            order.push(stmt);

            for &succ in &successors[local[&stmt]] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert((tiers[self.nodes[succ]], self.nodes[succ]));
                }
            }
        }

        if order.len() != n {
            return Err(PartitionError::Internal(format!(
                "dependency cycle: {} of {} statements scheduled",
                order.len(),
                n
            )));
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn facts(
        reads: &[VarId],
        writes: &[VarId],
    ) -> StmtFacts {
        StmtFacts {
            hint: Tier::Const,
            env_reads: reads.iter().copied().collect(),
            global_reads: BTreeSet::new(),
            writes: writes.iter().copied().collect(),
            partial_writes: BTreeSet::new(),
            forced: None,
            interp: None,
        }
    }

    // Graph-shape tests only need two distinct locations; the builtin
    // variants avoid setting up a whole program.
    fn a() -> VarId {
        VarId::Builtin(glslice_ast::BuiltinVar::Position)
    }

    fn b() -> VarId {
        VarId::Builtin(glslice_ast::BuiltinVar::FragCoord)
    }

    #[test]
    fn raw_war_waw_edges() {
        let list = vec![
            facts(&[], &[a()]),    // 0: write a
            facts(&[a()], &[b()]), // 1: read a, write b
            facts(&[], &[a()]),    // 2: overwrite a
        ];
        let tiers = vec![Tier::Vs; 3];
        let graph = DependencyGraph::build(&list, &tiers, &BTreeMap::new());

        let kinds: Vec<_> = graph
            .edges()
            .iter()
            .map(|e| (e.from, e.to, e.kind))
            .collect();
        assert!(kinds.contains(&(0, 1, DependencyKind::DataFlow)));
        assert!(kinds.contains(&(0, 2, DependencyKind::OutputDependency)));
        assert!(kinds.contains(&(1, 2, DependencyKind::AntiDependency)));
        assert!(!kinds.contains(&(1, 2, DependencyKind::DataFlow)));
    }

    #[test]
    fn independent_statements_sort_by_tier_then_source() {
        // Statement 0 is FS-tier, statement 1 VS-tier, no edges: the
        // schedule hoists the VS statement first.
        let list = vec![facts(&[], &[a()]), facts(&[], &[b()])];
        let tiers = vec![Tier::Fs, Tier::Vs];
        let graph = DependencyGraph::build(&list, &tiers, &BTreeMap::new());
        let order = graph.tier_schedule(&tiers).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn dependent_lower_tier_after_higher_is_a_conflict() {
        // Statement 0 (FS) reads `b`; statement 1 (VS) overwrites `b`:
        // the WAR edge forces FS before VS, which no tier grouping allows.
        let list = vec![facts(&[b()], &[a()]), facts(&[], &[b()])];
        let tiers = vec![Tier::Fs, Tier::Vs];
        let graph = DependencyGraph::build(&list, &tiers, &BTreeMap::new());
        let err = graph.tier_schedule(&tiers).unwrap_err();
        assert!(matches!(err, PartitionError::StageOrderConflict { .. }));
    }

    #[test]
    fn interpolated_symbols_drop_cross_tier_edges() {
        let mut interp = BTreeMap::new();
        interp.insert(b(), None);
        let list = vec![facts(&[b()], &[a()]), facts(&[], &[b()])];
        let tiers = vec![Tier::Fs, Tier::Vs];
        let graph = DependencyGraph::build(&list, &tiers, &interp);
        assert!(graph.edges().is_empty());
        let order = graph.tier_schedule(&tiers).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn empty_graph_schedules_empty() {
        let graph = DependencyGraph::build(&[], &[], &BTreeMap::new());
        assert_eq!(graph.tier_schedule(&[]).unwrap(), Vec::<usize>::new());
    }
}
