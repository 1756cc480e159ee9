//! The artifact bundle: per-stage GLSL sources plus the CPU binding
//! descriptors the rendering runtime wires buffers to.

use glslice_ast::Diagnostic;
use glslice_partition::VarId;

/// A uniform the CPU must set before drawing. Composed values (constant
/// and CPU-tier contributions folded together) point back at the symbol
/// they were composed for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformBinding {
    pub name: String,
    pub glsl_type: String,
    pub source: VarId,
}

/// A vertex attribute with its input location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeBinding {
    pub name: String,
    pub glsl_type: String,
    pub source: VarId,
    pub location: u32,
}

/// A texture sampler binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub name: String,
    pub sampler_kind: String,
    pub source: VarId,
}

/// Everything one compile produces.
#[derive(Clone, Debug)]
pub struct ArtifactBundle {
    /// GLSL 4.40 vertex shader source.
    pub vertex_shader: String,
    /// Forwarding-only geometry shader, when the pipeline has one.
    pub geometry_shader: Option<String>,
    /// GLSL 4.40 fragment shader source.
    pub fragment_shader: String,
    pub uniform_bindings: Vec<UniformBinding>,
    pub attribute_bindings: Vec<AttributeBinding>,
    pub texture_bindings: Vec<TextureBinding>,
    /// Non-fatal findings surfaced during the compile.
    pub diagnostics: Vec<Diagnostic>,
}
