//! Type model: canonical host types and their GLSL spellings.

use crate::arena::{Handle, UniqueArena};

/// Width of a scalar type in bytes.
pub type Bytes = u8;

/// The kind of a scalar type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// Signed integer.
    Sint,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Float,
}

/// A scalar type: kind + byte width.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub width: Bytes,
}

impl Scalar {
    pub const BOOL: Self = Self {
        kind: ScalarKind::Bool,
        width: 1,
    };
    pub const I32: Self = Self {
        kind: ScalarKind::Sint,
        width: 4,
    };
    pub const U32: Self = Self {
        kind: ScalarKind::Uint,
        width: 4,
    };
    pub const F32: Self = Self {
        kind: ScalarKind::Float,
        width: 4,
    };

    /// GLSL spelling of the scalar type.
    pub fn glsl_name(self) -> &'static str {
        match self.kind {
            ScalarKind::Bool => "bool",
            ScalarKind::Sint => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
        }
    }

    /// GLSL vector-name prefix (`vec`, `ivec`, `uvec`, `bvec`).
    fn glsl_vector_prefix(self) -> &'static str {
        match self.kind {
            ScalarKind::Bool => "bvec",
            ScalarKind::Sint => "ivec",
            ScalarKind::Uint => "uvec",
            ScalarKind::Float => "vec",
        }
    }
}

/// Number of components in a vector.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum VectorSize {
    /// 2 components.
    Bi = 2,
    /// 3 components.
    Tri = 3,
    /// 4 components.
    Quad = 4,
}

/// Sampler kind, by texture dimensionality.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SamplerDim {
    D2,
    D3,
    Cube,
    Shadow2D,
}

impl SamplerDim {
    /// GLSL spelling of the sampler type.
    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::D2 => "sampler2D",
            Self::D3 => "sampler3D",
            Self::Cube => "samplerCube",
            Self::Shadow2D => "sampler2DShadow",
        }
    }
}

/// A member of a struct type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: Handle<Type>,
}

/// A named type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Type {
    pub name: Option<String>,
    pub inner: TypeInner,
}

/// The concrete shape of a type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum TypeInner {
    /// A single scalar value.
    Scalar(Scalar),
    /// A vector of scalars.
    Vector { size: VectorSize, scalar: Scalar },
    /// A float matrix. Stored as GLSL sees it: `columns` column vectors of
    /// `rows` components each. Host `MatRxC` constructors swap into this
    /// layout, so a host 2x3 matrix spells `mat3x2`.
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
    },
    /// A fixed-size array.
    Array { base: Handle<Type>, size: u32 },
    /// A composite record type.
    Struct { members: Vec<StructMember> },
    /// An opaque texture sampler.
    Sampler { dim: SamplerDim },
    /// A host-only reference type. Never representable in GLSL; exists so
    /// the front end can hand us the full tree and get a proper error.
    Pointer { base: Handle<Type> },
}

/// Errors produced by the type model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// The type has no GLSL spelling.
    #[error("type `{0}` is not representable in GLSL")]
    NotRepresentable(String),
}

/// Returns the GLSL spelling of a type.
///
/// Matrices follow GLSL's column-major `matCxR` naming (a host 2-row,
/// 3-column matrix spells `mat3x2`); square matrices collapse to `matN`.
/// Fixed arrays use the GLSL 4.x `T[N]` spelling. Struct types spell as
/// their declared name; the per-stage `struct` declaration is the
/// emitter's job.
pub fn glsl_type_name(types: &UniqueArena<Type>, handle: Handle<Type>) -> Result<String, TypeError> {
    let ty = &types[handle];
    match ty.inner {
        TypeInner::Scalar(scalar) => Ok(scalar.glsl_name().to_string()),
        TypeInner::Vector { size, scalar } => {
            Ok(format!("{}{}", scalar.glsl_vector_prefix(), size as u32))
        }
        TypeInner::Matrix { columns, rows } => {
            if columns == rows {
                Ok(format!("mat{}", columns as u32))
            } else {
                Ok(format!("mat{}x{}", columns as u32, rows as u32))
            }
        }
        TypeInner::Array { base, size } => {
            let elem = glsl_type_name(types, base)?;
            Ok(format!("{elem}[{size}]"))
        }
        TypeInner::Struct { .. } => ty
            .name
            .clone()
            .ok_or_else(|| TypeError::NotRepresentable("anonymous struct".into())),
        TypeInner::Sampler { dim } => Ok(dim.glsl_name().to_string()),
        TypeInner::Pointer { .. } => Err(TypeError::NotRepresentable(describe(types, handle))),
    }
}

/// Returns `true` for sampler types.
pub fn is_sampler(types: &UniqueArena<Type>, handle: Handle<Type>) -> bool {
    matches!(types[handle].inner, TypeInner::Sampler { .. })
}

/// Returns the scalar component of a scalar or vector type.
pub fn scalar_of(types: &UniqueArena<Type>, handle: Handle<Type>) -> Option<Scalar> {
    match types[handle].inner {
        TypeInner::Scalar(s) => Some(s),
        TypeInner::Vector { scalar, .. } => Some(scalar),
        _ => None,
    }
}

/// A short human-readable description, for error messages.
pub fn describe(types: &UniqueArena<Type>, handle: Handle<Type>) -> String {
    let ty = &types[handle];
    if let Some(name) = &ty.name {
        return name.clone();
    }
    match ty.inner {
        TypeInner::Scalar(s) => s.glsl_name().to_string(),
        TypeInner::Vector { size, scalar } => {
            format!("{}{}", scalar.glsl_vector_prefix(), size as u32)
        }
        TypeInner::Matrix { columns, rows } => format!("mat{}x{}", columns as u32, rows as u32),
        TypeInner::Array { base, size } => format!("{}[{size}]", describe(types, base)),
        TypeInner::Struct { .. } => "struct".to_string(),
        TypeInner::Sampler { dim } => dim.glsl_name().to_string(),
        TypeInner::Pointer { base } => format!("ref {}", describe(types, base)),
    }
}
