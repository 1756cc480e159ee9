//! Symbols: resolved identities for every named thing in the tree.

use crate::arena::Handle;
use crate::types::Type;
use crate::SourceLoc;

/// The syntactic role of a symbol.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SymbolKind {
    /// A procedure parameter.
    Param,
    /// A function-local variable.
    Local,
    /// The pipeline output record (`result`).
    Result,
    /// A module-level variable set from the CPU.
    Global,
    /// A module-level compile-time constant.
    ModuleConst,
    /// A user-defined procedure.
    Proc,
    /// A record field.
    Field,
}

/// Pipeline-visible builtin variables.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum BuiltinVar {
    /// `gl_Position`: written by the vertex stage.
    Position,
    /// `gl_FragCoord`: readable only in the fragment stage.
    FragCoord,
}

impl BuiltinVar {
    /// The GLSL spelling of the builtin.
    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::Position => "gl_Position",
            Self::FragCoord => "gl_FragCoord",
        }
    }
}

/// How a global-ish symbol binds to the pipeline.
///
/// This is what gives a symbol reference its tier hint: module constants
/// are CONST, CPU-dynamic globals are CPU, vertex attributes are VS, and
/// sampling a texture is FS (unless vertex texture fetch is enabled).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum GlobalClass {
    /// A compile-time module constant.
    ModuleConst,
    /// A CPU-dynamic variable, delivered to shaders as a uniform.
    CpuDynamic,
    /// A flattened vertex-attribute field with its input location.
    Attribute { location: u32 },
    /// A texture sampler.
    Sampler,
    /// A flattened fragment-output field with its output index.
    FragOutput { index: u32 },
    /// A pipeline builtin.
    Builtin(BuiltinVar),
}

/// A resolved symbol: name, role, type, and pipeline binding.
///
/// `parent` links flattened interface fields back to their receiver record
/// (`v.position` resolves to the `position` field whose parent is `v`).
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Handle<Type>,
    pub class: Option<GlobalClass>,
    pub parent: Option<Handle<Symbol>>,
    pub loc: Option<SourceLoc>,
}

impl Symbol {
    /// Returns the attribute input location, for attribute fields.
    pub fn attribute_location(&self) -> Option<u32> {
        match self.class {
            Some(GlobalClass::Attribute { location }) => Some(location),
            _ => None,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_spellings() {
        assert_eq!(BuiltinVar::Position.glsl_name(), "gl_Position");
        assert_eq!(BuiltinVar::FragCoord.glsl_name(), "gl_FragCoord");
    }

    #[test]
    fn attribute_location_only_for_attributes() {
        let class = GlobalClass::Attribute { location: 3 };
        assert_eq!(class, GlobalClass::Attribute { location: 3 });
        let sym = Symbol {
            name: "position".into(),
            kind: SymbolKind::Field,
            ty: crate::arena::Handle::new(0),
            class: Some(class),
            parent: None,
            loc: None,
        };
        assert_eq!(sym.attribute_location(), Some(3));
    }
}
