//! Built-in demo pipelines.
//!
//! The host-language parser is an external collaborator, so the CLI
//! exercises the compiler with typed trees built directly. Each demo is
//! a small but complete unified pipeline program.

use glslice_ast::builder::ProgramBuilder;
use glslice_ast::{BinaryOp, Interpolation, MathFunction, Program, SamplerDim};

/// Names of the available demos, in listing order.
pub const DEMO_NAMES: &[&str] = &["textured", "phong", "zones"];

/// Builds a demo pipeline by name.
pub fn build(name: &str) -> Option<Program> {
    match name {
        "textured" => Some(textured()),
        "phong" => Some(phong()),
        "zones" => Some(zones()),
        _ => None,
    }
}

/// Tinted texturing: constant, uniform, per-vertex, and per-fragment
/// contributions accumulate into the output color, so every tier of the
/// pipeline participates.
fn textured() -> Program {
    let mut b = ProgramBuilder::new();
    let f32_ty = b.ty_f32();
    let m4 = b.ty_mat4();
    let v2 = b.ty_vec2();
    let v4 = b.ty_vec4();

    let mvp = b.uniform("mvp", m4);
    let tint = b.uniform("tint", f32_ty);
    let tex = b.texture_uniform("baseColor", SamplerDim::D2);
    let pos = b.vertex_input("position", v4);
    let uv = b.vertex_input("texcoord", v2);
    let color = b.fragment_output("color", v4);

    // gl.Position = mvp * v.position
    let m = b.read(mvp);
    let p = b.input(pos);
    let clip = b.mul(m, p);
    let gl_pos = b.position();
    let s = b.assign(gl_pos, clip);
    b.push(s);

    // result.color.r = 0.25 + tint
    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let quarter = b.lit_f32(0.25);
    let t = b.read(tint);
    let base = b.add(quarter, t);
    let s = b.assign(out_r, base);
    b.push(s);

    // result.color.r += v.position.x
    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let p = b.input(pos);
    let px = b.swizzle(p, "x");
    let s = b.compound(out_r, BinaryOp::Add, px);
    b.push(s);

    // result.color += texture(baseColor, v.texcoord)
    let out = b.output(color);
    let uv_ref = b.input(uv);
    let sample = b.texture(tex, uv_ref);
    let s = b.compound(out, BinaryOp::Add, sample);
    b.push(s);

    b.finish()
}

/// Per-fragment diffuse lighting through a user procedure and an
/// interpolated normal.
fn phong() -> Program {
    let mut b = ProgramBuilder::new();
    let f32_ty = b.ty_f32();
    let m4 = b.ty_mat4();
    let v3 = b.ty_vec3();
    let v4 = b.ty_vec4();

    let mvp = b.uniform("mvp", m4);
    let light_dir = b.uniform("lightDir", v3);
    let albedo = b.uniform("albedo", v4);
    let pos = b.vertex_input("position", v4);
    let normal = b.vertex_input("normal", v3);
    let color = b.fragment_output("color", v4);

    // proc lambert(n, l): return max(dot(n, l), 0.0)
    let n = b.param("n", v3);
    let l = b.param("l", v3);
    let n_ref = b.read(n);
    let l_ref = b.read(l);
    let d = b.math(MathFunction::Dot, &[n_ref, l_ref]);
    let zero = b.lit_f32(0.0);
    let clamped = b.math(MathFunction::Max, &[d, zero]);
    let ret = b.ret(Some(clamped));
    let lambert = b.proc("lambert", vec![n, l], Some(f32_ty), vec![ret]);

    // gl.Position = mvp * v.position
    let m = b.read(mvp);
    let p = b.input(pos);
    let clip = b.mul(m, p);
    let gl_pos = b.position();
    let s = b.assign(gl_pos, clip);
    b.push(s);

    // let nrm = normalize(v.normal); interpolate(nrm)
    let nrm = b.local("nrm", v3);
    let n_in = b.input(normal);
    let normalized = b.math(MathFunction::Normalize, &[n_in]);
    let s = b.let_(nrm, normalized);
    b.push(s);
    let target = b.read(nrm);
    let s = b.interpolate(target, None);
    b.push(s);

    // result.color = albedo * lambert(nrm, lightDir)
    let out = b.output(color);
    let a = b.read(albedo);
    let nrm_ref = b.read(nrm);
    let ld = b.read(light_dir);
    let diffuse = b.call(lambert, &[nrm_ref, ld]);
    let lit = b.mul(a, diffuse);
    let s = b.assign(out, lit);
    b.push(s);

    b.finish()
}

/// A flat boolean varying drives a per-fragment branch.
fn zones() -> Program {
    let mut b = ProgramBuilder::new();
    let m4 = b.ty_mat4();
    let v4 = b.ty_vec4();
    let bool_ty = b.ty_bool();

    let mvp = b.uniform("mvp", m4);
    let pos = b.vertex_input("position", v4);
    let color = b.fragment_output("color", v4);

    // gl.Position = mvp * v.position
    let m = b.read(mvp);
    let p = b.input(pos);
    let clip = b.mul(m, p);
    let gl_pos = b.position();
    let s = b.assign(gl_pos, clip);
    b.push(s);

    // let upper = gl.Position.z > 0.5; interpolate(upper, flat)
    let upper = b.local("upper", bool_ty);
    let gl_pos = b.position();
    let z = b.swizzle(gl_pos, "z");
    let half = b.lit_f32(0.5);
    let cmp = b.gt(z, half);
    let s = b.let_(upper, cmp);
    b.push(s);
    let target = b.read(upper);
    let s = b.interpolate(target, Some(Interpolation::Flat));
    b.push(s);

    // if upper: result.color = red else: result.color = green
    let one = b.lit_f32(1.0);
    let zero = b.lit_f32(0.0);
    let red = b.construct(v4, &[one, zero, zero, one]);
    let green = b.construct(v4, &[zero, one, zero, one]);
    let out_then = b.output(color);
    let out_else = b.output(color);
    let cond = b.read(upper);
    let then_branch = vec![b.assign(out_then, red)];
    let else_branch = vec![b.assign(out_else, green)];
    let s = b.if_(cond, then_branch, else_branch);
    b.push(s);

    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslice_partition::PipelineConfig;

    #[test]
    fn every_demo_compiles() {
        for name in DEMO_NAMES {
            let program = build(name).unwrap();
            let bundle = glslice_glsl::compile(&program, &PipelineConfig::default())
                .unwrap_or_else(|e| panic!("demo `{name}` failed: {e}"));
            assert!(bundle.vertex_shader.starts_with("#version 440\n"));
            assert!(bundle.fragment_shader.starts_with("#version 440\n"));
        }
    }

    #[test]
    fn unknown_demo_is_none() {
        assert!(build("nonexistent").is_none());
    }

    #[test]
    fn zones_uses_a_flat_int_varying() {
        let program = build("zones").unwrap();
        let bundle = glslice_glsl::compile(&program, &PipelineConfig::default()).unwrap();
        assert!(bundle.vertex_shader.contains("flat out int vert2frag_upper;"));
        assert!(bundle.fragment_shader.contains("flat in int vert2frag_upper;"));
        assert!(bundle
            .fragment_shader
            .contains("bool frag_upper = vert2frag_upper != 0;"));
    }

    #[test]
    fn phong_emits_the_procedure_in_the_fragment_stage() {
        let program = build("phong").unwrap();
        let bundle = glslice_glsl::compile(&program, &PipelineConfig::default()).unwrap();
        assert!(bundle.fragment_shader.contains("float lambert(vec3 n, vec3 l)"));
        assert!(!bundle.vertex_shader.contains("float lambert"));
    }
}
