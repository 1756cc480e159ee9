//! Human-readable rendering of a partition plan, for debugging and the
//! CLI's `--emit-plan` output.

use glslice_ast::{stmt_to_string, Program};

use crate::partition::PartitionPlan;
use crate::tier::Tier;

/// Formats the plan: per-tier execution order, liveness, and every
/// cross-tier delivery.
pub fn dump_plan(program: &Program, plan: &PartitionPlan) -> String {
    let mut out = String::new();

    for tier in [Tier::Const, Tier::Cpu, Tier::Vs, Tier::Ts, Tier::Gs, Tier::Fs] {
        let stmts: Vec<usize> = plan
            .order
            .iter()
            .copied()
            .filter(|&i| plan.tiers[i] == tier)
            .collect();
        if stmts.is_empty() {
            continue;
        }
        out.push_str(&format!("{tier}:\n"));
        for i in stmts {
            let marker = if plan.live[i] { "  " } else { "x " };
            out.push_str(&format!(
                "  {marker}[{i}] {}\n",
                stmt_to_string(program, &program.body[i])
            ));
        }
    }

    if !plan.crossings.is_empty() {
        out.push_str("Crossings:\n");
        for c in &plan.crossings {
            out.push_str(&format!(
                "  {} : {} -> {}\n",
                c.var.describe(program),
                c.from,
                c.to
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use crate::tier::PipelineConfig;
    use glslice_ast::builder::ProgramBuilder;
    use glslice_ast::Diagnostics;

    #[test]
    fn dump_groups_by_tier() {
        let mut b = ProgramBuilder::new();
        let m4 = b.ty_mat4();
        let mvp = b.uniform("mvp", m4);
        let v4 = b.ty_vec4();
        let pos = b.vertex_input("position", v4);
        let m = b.read(mvp);
        let p = b.input(pos);
        let rhs = b.mul(m, p);
        let lhs = b.position();
        let s = b.assign(lhs, rhs);
        b.push(s);
        let program = b.finish();

        let mut diags = Diagnostics::new();
        let plan = partition(&program, &PipelineConfig::default(), &mut diags).unwrap();
        let dump = dump_plan(&program, &plan);
        assert!(dump.contains("VS:"));
        assert!(dump.contains("gl_Position"));
    }
}
