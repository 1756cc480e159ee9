//! Shared program builders and GLSL text helpers for the e2e suites.

use glslice_ast::builder::ProgramBuilder;
use glslice_ast::{BinaryOp, Program, SamplerDim};
use glslice_glsl::{compile, ArtifactBundle, CompileError};
use glslice_partition::PipelineConfig;

/// Compiles with the default VS+FS configuration.
#[allow(dead_code)]
pub fn compile_default(program: &Program) -> Result<ArtifactBundle, CompileError> {
    compile(program, &PipelineConfig::default())
}

/// The every-tier accumulation pipeline: a constant, a CPU uniform, a
/// vertex attribute, and a texture sample all add into the output color.
#[allow(dead_code)]
pub fn accumulation_program() -> Program {
    let mut b = ProgramBuilder::new();
    let f32_ty = b.ty_f32();
    let my_uniform = b.uniform("myUniform", f32_ty);
    let tex = b.texture_uniform("myTex", SamplerDim::D2);
    let v2 = b.ty_vec2();
    let uv = b.vertex_input("texcoord", v2);
    let v4 = b.ty_vec4();
    let pos = b.vertex_input("position", v4);
    let color = b.fragment_output("color", v4);

    // result.color.r = 0.0
    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let zero = b.lit_f32(0.0);
    let s = b.assign(out_r, zero);
    b.push(s);
    // result.color.r += 0.123456
    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let k = b.lit_f32(0.123456);
    let s = b.compound(out_r, BinaryOp::Add, k);
    b.push(s);
    // result.color.r += myUniform
    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let u = b.read(my_uniform);
    let s = b.compound(out_r, BinaryOp::Add, u);
    b.push(s);
    // result.color.r += v.position.x
    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let p = b.input(pos);
    let px = b.swizzle(p, "x");
    let s = b.compound(out_r, BinaryOp::Add, px);
    b.push(s);
    // result.color.r += texture(myTex, v.texcoord).r
    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let uv_ref = b.input(uv);
    let sample = b.texture(tex, uv_ref);
    let sr = b.swizzle(sample, "r");
    let s = b.compound(out_r, BinaryOp::Add, sr);
    b.push(s);

    b.finish()
}

/// The reorder pipeline: an FS-tier statement precedes an independent
/// VS-tier statement in source order.
#[allow(dead_code)]
pub fn reorder_program() -> Program {
    let mut b = ProgramBuilder::new();
    let tex = b.texture_uniform("myTex", SamplerDim::D2);
    let m4 = b.ty_mat4();
    let mvp = b.uniform("mvp", m4);
    let v2 = b.ty_vec2();
    let uv = b.vertex_input("texcoord", v2);
    let v4 = b.ty_vec4();
    let pos = b.vertex_input("position", v4);
    let color = b.fragment_output("color", v4);

    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let uv_ref = b.input(uv);
    let sample = b.texture(tex, uv_ref);
    let sr = b.swizzle(sample, "r");
    let s = b.assign(out_r, sr);
    b.push(s);

    let m = b.read(mvp);
    let p = b.input(pos);
    let clip = b.mul(m, p);
    let gl_pos = b.position();
    let s = b.assign(gl_pos, clip);
    b.push(s);

    b.finish()
}

/// The illegal split: the output is written at FS, then read at a VS
/// write site. `with_interpolate` appends the override that fixes it.
#[allow(dead_code)]
pub fn split_program(with_interpolate: bool) -> Program {
    let mut b = ProgramBuilder::new();
    let tex = b.texture_uniform("myTex", SamplerDim::D2);
    let v2 = b.ty_vec2();
    let uv = b.vertex_input("texcoord", v2);
    let v4 = b.ty_vec4();
    let color = b.fragment_output("color", v4);

    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let uv_ref = b.input(uv);
    let sample = b.texture(tex, uv_ref);
    let sr = b.swizzle(sample, "r");
    let s = b.assign(out_r, sr);
    b.push(s);

    let out = b.output(color);
    let out_r = b.swizzle(out, "r");
    let gl_pos = b.position();
    let rhs = b.construct(v4, &[out_r]);
    let s = b.assign(gl_pos, rhs);
    b.push(s);

    if with_interpolate {
        let target = b.output(color);
        let s = b.interpolate(target, None);
        b.push(s);
    }

    b.finish()
}

/// A parsed `layout(location = N) [qualifier] in|out TYPE NAME;` line.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoDecl {
    pub location: u32,
    pub qualifier: String,
    pub direction: String,
    pub glsl_type: String,
    pub name: String,
}

/// Extracts the `in`/`out` interface declarations of a stage document.
#[allow(dead_code)]
pub fn io_decls(source: &str, direction: &str) -> Vec<IoDecl> {
    let mut decls = Vec::new();
    for line in source.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("layout(location = ") else {
            continue;
        };
        let Some((loc, rest)) = rest.split_once(')') else {
            continue;
        };
        let location: u32 = loc.trim().parse().unwrap();
        let mut words: Vec<&str> = rest
            .trim()
            .trim_end_matches(';')
            .split_whitespace()
            .collect();
        let qualifier = if words[0] == "flat" || words[0] == "noperspective" {
            let q = words.remove(0);
            q.to_string()
        } else {
            "smooth".to_string()
        };
        if words[0] != direction {
            continue;
        }
        decls.push(IoDecl {
            location,
            qualifier,
            direction: words[0].to_string(),
            glsl_type: words[1].to_string(),
            name: words[2].trim_end_matches("[]").to_string(),
        });
    }
    decls
}

/// The byte offset of a needle, asserting it occurs exactly once.
#[allow(dead_code)]
pub fn position_of(haystack: &str, needle: &str) -> usize {
    let first = haystack
        .find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not found"));
    assert_eq!(
        haystack.rfind(needle),
        Some(first),
        "`{needle}` occurs more than once"
    );
    first
}
