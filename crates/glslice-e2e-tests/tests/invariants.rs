//! Structural invariants that hold for every accepted program.

mod common;

use std::collections::BTreeSet;

use common::{accumulation_program, compile_default, io_decls, position_of};
use glslice_ast::{Diagnostics, Program};
use glslice_partition::{partition, PipelineConfig};

/// `#version 440` is the first non-empty line of every stage.
#[test]
fn version_directive_leads() {
    let bundle = compile_default(&accumulation_program()).unwrap();
    for source in [&bundle.vertex_shader, &bundle.fragment_shader] {
        let first = source.lines().find(|l| !l.trim().is_empty()).unwrap();
        assert_eq!(first, "#version 440");
    }
}

/// Declarations group in order: uniforms, vertex inputs, `in` varyings,
/// `out` varyings or fragment outputs.
#[test]
fn declaration_sections_are_ordered() {
    let bundle = compile_default(&accumulation_program()).unwrap();

    let vs = &bundle.vertex_shader;
    let uniform_pos = position_of(vs, "uniform vec4 uniform_result_color;");
    let attr_pos = position_of(vs, "in vec4 position;");
    let out_pos = position_of(vs, "out vec4 vert2frag_result_color;");
    assert!(uniform_pos < attr_pos);
    assert!(attr_pos < out_pos);

    let fs = &bundle.fragment_shader;
    let sampler_pos = position_of(fs, "uniform sampler2D myTex;");
    let in_pos = position_of(fs, "in vec4 vert2frag_result_color;");
    let frag_out_pos = position_of(fs, "out vec4 out_result_color;");
    assert!(sampler_pos < in_pos);
    assert!(in_pos < frag_out_pos);
}

/// Every `in` on the consuming stage has a matching `out` on the
/// producing stage: same location, type, and qualifier; locations are
/// unique per boundary.
#[test]
fn varying_pairs_match_and_locations_are_unique() {
    let bundle = compile_default(&accumulation_program()).unwrap();

    let mut outs = io_decls(&bundle.vertex_shader, "out");
    let mut ins = io_decls(&bundle.fragment_shader, "in");
    outs.sort_by_key(|d| d.location);
    ins.sort_by_key(|d| d.location);

    assert_eq!(outs.len(), ins.len());
    for (o, i) in outs.iter().zip(ins.iter()) {
        assert_eq!(o.location, i.location);
        assert_eq!(o.glsl_type, i.glsl_type);
        assert_eq!(o.qualifier, i.qualifier);
        assert_eq!(o.name, i.name);
    }

    let locations: BTreeSet<u32> = outs.iter().map(|d| d.location).collect();
    assert_eq!(locations.len(), outs.len());
    assert_eq!(locations, (0..outs.len() as u32).collect());
}

/// The partition plan is a total function over executable statements,
/// and the reordered sequence is a permutation of the source.
#[test]
fn plan_is_total_and_a_permutation() {
    let program = accumulation_program();
    let mut diags = Diagnostics::new();
    let plan = partition(&program, &PipelineConfig::default(), &mut diags).unwrap();

    assert_eq!(plan.tiers.len(), program.body.len());
    let mut sorted = plan.order.clone();
    sorted.sort_unstable();
    let executable: Vec<usize> = (0..program.body.len())
        .filter(|&i| !plan.facts[i].is_directive())
        .collect();
    assert_eq!(sorted, executable);
}

/// Reordering preserves every dependency edge.
#[test]
fn order_respects_dependencies() {
    let program = accumulation_program();
    let mut diags = Diagnostics::new();
    let plan = partition(&program, &PipelineConfig::default(), &mut diags).unwrap();

    let graph = glslice_partition::DependencyGraph::build(
        &plan.facts,
        &plan.tiers,
        &plan.interpolated,
    );
    let rank: Vec<usize> = {
        let mut rank = vec![0; plan.tiers.len()];
        for (pos, &i) in plan.order.iter().enumerate() {
            rank[i] = pos;
        }
        rank
    };
    for edge in graph.edges() {
        assert!(
            rank[edge.from] < rank[edge.to],
            "edge {} -> {} violated by the schedule",
            edge.from,
            edge.to
        );
    }
}

/// Recompiling the same input yields byte-identical output.
#[test]
fn compiles_are_deterministic() {
    let program = accumulation_program();
    let a = compile_default(&program).unwrap();
    let b = compile_default(&program).unwrap();
    assert_eq!(a.vertex_shader, b.vertex_shader);
    assert_eq!(a.fragment_shader, b.fragment_shader);
    assert_eq!(a.uniform_bindings, b.uniform_bindings);
    assert_eq!(a.attribute_bindings, b.attribute_bindings);
    assert_eq!(a.texture_bindings, b.texture_bindings);
}

/// An empty program emits empty `main`s, no varyings, and no bindings.
#[test]
fn empty_program_compiles_to_empty_mains() {
    let bundle = compile_default(&Program::default()).unwrap();
    for source in [&bundle.vertex_shader, &bundle.fragment_shader] {
        assert!(source.starts_with("#version 440\n"));
        assert!(source.contains("void main() {\n}"));
        assert!(!source.contains("layout("));
    }
    assert!(bundle.uniform_bindings.is_empty());
    assert!(bundle.attribute_bindings.is_empty());
    assert!(bundle.texture_bindings.is_empty());
}
