//! GLSL 4.40 emission and the glslice compile driver.
//!
//! `compile` runs the whole pipeline: partition the typed program, plan
//! the varyings, emit one GLSL document per present stage, and assemble
//! the artifact bundle with its CPU binding descriptors.

mod bundle;
mod emit;

pub use bundle::{ArtifactBundle, AttributeBinding, TextureBinding, UniformBinding};
pub use emit::GlslEmitter;

use std::collections::BTreeSet;

use glslice_ast::names::NameTable;
use glslice_ast::{DiagKind, Diagnostic, Diagnostics, GlobalClass, Program, TypeError, TypeInner};
use glslice_partition::{partition, plan_varyings, PartitionError, PipelineConfig, Tier, VarId};

/// A fatal compile failure. Warnings never appear here; they travel in
/// the bundle's diagnostics list.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Type(#[from] TypeError),

    /// Tessellation is representable in the stage lattice but the
    /// partitioner contract does not cover cross-patch aggregation.
    #[error("tessellation stages are not supported")]
    TessellationUnsupported,
}

impl CompileError {
    /// The diagnostic kind for this failure.
    pub fn kind(&self) -> DiagKind {
        match self {
            Self::Partition(e) => e.kind(),
            Self::Type(_) => DiagKind::TypeNotRepresentable,
            Self::TessellationUnsupported => DiagKind::UnsupportedConstruct,
        }
    }

    /// Renders this failure as a diagnostic record.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Partition(e) => e.to_diagnostic(),
            _ => Diagnostic::error(self.kind(), self.to_string()),
        }
    }
}

/// Compiles a unified pipeline program into per-stage GLSL plus CPU
/// binding descriptors.
///
/// The output is a deterministic function of the program and the
/// configuration: recompiling the same input yields byte-identical
/// sources.
pub fn compile(program: &Program, config: &PipelineConfig) -> Result<ArtifactBundle, CompileError> {
    if config.tessellation {
        return Err(CompileError::TessellationUnsupported);
    }

    let mut diags = Diagnostics::new();
    let plan = partition(program, config, &mut diags)?;
    let mut names = NameTable::new();
    let varyings = plan_varyings(program, &plan, &mut names)?;

    let (vertex_shader, geometry_shader, fragment_shader) = {
        let mut emitter = GlslEmitter::new(program, &plan, &varyings, &mut names);
        let vs = emitter.emit_stage(Tier::Vs)?;
        let gs = if plan.stages.contains(Tier::Gs) {
            Some(emitter.emit_geometry()?)
        } else {
            None
        };
        let fs = emitter.emit_stage(Tier::Fs)?;
        (vs, gs, fs)
    };

    // Uniform bindings: every value delivered from the CPU side,
    // composed instances included.
    let uniform_vars: BTreeSet<VarId> = plan
        .crossings
        .iter()
        .filter(|c| !c.from.is_shader_stage())
        .map(|c| c.var)
        .collect();
    let mut uniform_bindings = Vec::new();
    for var in uniform_vars {
        let VarId::Sym(h) = var else {
            return Err(PartitionError::Internal(
                "a builtin arrived as a uniform delivery".into(),
            )
            .into());
        };
        let ident = names.ident(&program.symbols, h);
        uniform_bindings.push(UniformBinding {
            name: format!("uniform_{ident}"),
            glsl_type: glslice_ast::glsl_type_name(&program.types, program.symbols[h].ty)?,
            source: var,
        });
    }
    uniform_bindings.sort_by(|a, b| a.name.cmp(&b.name));

    // Attribute bindings: every declared vertex input.
    let mut attribute_bindings = Vec::new();
    for (h, sym) in program.symbols.iter() {
        if let Some(GlobalClass::Attribute { location }) = sym.class {
            let ident = names.ident(&program.symbols, h);
            attribute_bindings.push(AttributeBinding {
                name: ident,
                glsl_type: glslice_ast::glsl_type_name(&program.types, sym.ty)?,
                source: VarId::Sym(h),
                location,
            });
        }
    }
    attribute_bindings.sort_by_key(|a| a.location);

    // Texture bindings: samplers read by live statements.
    let mut sampler_vars: BTreeSet<VarId> = BTreeSet::new();
    for (i, f) in plan.facts.iter().enumerate() {
        if !plan.live.get(i).copied().unwrap_or(false) {
            continue;
        }
        for &g in &f.global_reads {
            if let VarId::Sym(h) = g {
                if matches!(program.symbols[h].class, Some(GlobalClass::Sampler)) {
                    sampler_vars.insert(g);
                }
            }
        }
    }
    let mut texture_bindings = Vec::new();
    for var in sampler_vars {
        let VarId::Sym(h) = var else { continue };
        let ident = names.ident(&program.symbols, h);
        let kind = match program.types[program.symbols[h].ty].inner {
            TypeInner::Sampler { dim } => dim.glsl_name().to_string(),
            _ => {
                return Err(PartitionError::Internal(format!(
                    "sampler global `{ident}` has a non-sampler type"
                ))
                .into())
            }
        };
        texture_bindings.push(TextureBinding {
            name: ident,
            sampler_kind: kind,
            source: var,
        });
    }
    texture_bindings.sort_by(|a, b| a.name.cmp(&b.name));

    log::debug!(
        "emitted {} uniform(s), {} attribute(s), {} texture(s)",
        uniform_bindings.len(),
        attribute_bindings.len(),
        texture_bindings.len(),
    );

    Ok(ArtifactBundle {
        vertex_shader,
        geometry_shader,
        fragment_shader,
        uniform_bindings,
        attribute_bindings,
        texture_bindings,
        diagnostics: diags.into_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslice_ast::builder::ProgramBuilder;

    fn passthrough_program() -> Program {
        let mut b = ProgramBuilder::new();
        let m4 = b.ty_mat4();
        let mvp = b.uniform("mvp", m4);
        let v4 = b.ty_vec4();
        let pos = b.vertex_input("position", v4);
        let color = b.fragment_output("color", v4);

        let m = b.read(mvp);
        let p = b.input(pos);
        let rhs = b.mul(m, p);
        let lhs = b.position();
        let s0 = b.assign(lhs, rhs);
        b.push(s0);

        let out = b.output(color);
        let p2 = b.input(pos);
        let s1 = b.assign(out, p2);
        b.push(s1);

        b.finish()
    }

    #[test]
    fn version_directive_is_first() {
        let bundle = compile(&passthrough_program(), &PipelineConfig::default()).unwrap();
        assert!(bundle.vertex_shader.starts_with("#version 440\n"));
        assert!(bundle.fragment_shader.starts_with("#version 440\n"));
    }

    #[test]
    fn vertex_stage_declares_uniform_and_attribute() {
        let bundle = compile(&passthrough_program(), &PipelineConfig::default()).unwrap();
        assert!(bundle.vertex_shader.contains("uniform mat4 uniform_mvp;"));
        assert!(bundle
            .vertex_shader
            .contains("layout(location = 0) in vec4 position;"));
        assert!(bundle.vertex_shader.contains("gl_Position"));
    }

    #[test]
    fn bindings_are_reported() {
        let bundle = compile(&passthrough_program(), &PipelineConfig::default()).unwrap();
        assert_eq!(bundle.uniform_bindings.len(), 1);
        assert_eq!(bundle.uniform_bindings[0].name, "uniform_mvp");
        assert_eq!(bundle.uniform_bindings[0].glsl_type, "mat4");
        assert_eq!(bundle.attribute_bindings.len(), 1);
        assert_eq!(bundle.attribute_bindings[0].name, "position");
        assert_eq!(bundle.attribute_bindings[0].location, 0);
        assert!(bundle.texture_bindings.is_empty());
    }

    #[test]
    fn recompilation_is_byte_identical() {
        let program = passthrough_program();
        let a = compile(&program, &PipelineConfig::default()).unwrap();
        let b = compile(&program, &PipelineConfig::default()).unwrap();
        assert_eq!(a.vertex_shader, b.vertex_shader);
        assert_eq!(a.fragment_shader, b.fragment_shader);
    }

    #[test]
    fn tessellation_is_rejected() {
        let config = PipelineConfig {
            tessellation: true,
            ..Default::default()
        };
        let err = compile(&passthrough_program(), &config).unwrap_err();
        assert!(matches!(err, CompileError::TessellationUnsupported));
        assert_eq!(err.kind(), DiagKind::UnsupportedConstruct);
    }

    #[test]
    fn geometry_stage_forwards_varyings() {
        let config = PipelineConfig {
            geometry: true,
            ..Default::default()
        };
        // The fragment output is written at VS tier, so it crosses
        // VS→GS→FS and the GS must copy it through.
        let bundle = compile(&passthrough_program(), &config).unwrap();
        let gs = bundle.geometry_shader.expect("geometry stage present");
        assert!(gs.contains("layout(triangles) in;"));
        assert!(gs.contains("vert2geom_result_color"));
        assert!(gs.contains("geom2frag_result_color"));
        assert!(gs.contains("EmitVertex();"));
        // Matching pair in the neighbours.
        assert!(bundle.vertex_shader.contains("out vec4 vert2geom_result_color;"));
        assert!(bundle.fragment_shader.contains("in vec4 geom2frag_result_color;"));
    }
}
