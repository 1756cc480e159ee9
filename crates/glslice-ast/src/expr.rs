//! Expressions of the typed syntax tree.

use crate::arena::Handle;
use crate::symbol::Symbol;
use crate::types::{Scalar, Type};
use crate::SourceLoc;

/// A literal constant value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
}

impl Literal {
    /// Returns the scalar type of this literal.
    pub fn scalar(&self) -> Scalar {
        match *self {
            Self::Bool(_) => Scalar::BOOL,
            Self::I32(_) => Scalar::I32,
            Self::U32(_) => Scalar::U32,
            Self::F32(_) => Scalar::F32,
        }
    }
}

/// A prefix operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitwiseNot,
}

/// An infix operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOp {
    /// Returns `true` for operators whose result is boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
        )
    }
}

/// A built-in math function with a fixed GLSL spelling.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MathFunction {
    // Component-wise
    Abs,
    Min,
    Max,
    Clamp,
    /// The host `modulo` call; floating-point `mod(x, y)` in GLSL.
    Mod,
    // Rounding
    Floor,
    Ceil,
    Round,
    Fract,
    // Trigonometric
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    // Exponential
    Sqrt,
    InverseSqrt,
    Log,
    Log2,
    Exp,
    Exp2,
    Pow,
    // Linear algebra
    Dot,
    Cross,
    Normalize,
    Length,
    Distance,
    Reflect,
    // Interpolation
    Mix,
    Step,
    SmoothStep,
}

impl MathFunction {
    /// GLSL spelling of the function.
    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Clamp => "clamp",
            Self::Mod => "mod",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Fract => "fract",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sqrt => "sqrt",
            Self::InverseSqrt => "inversesqrt",
            Self::Log => "log",
            Self::Log2 => "log2",
            Self::Exp => "exp",
            Self::Exp2 => "exp2",
            Self::Pow => "pow",
            Self::Dot => "dot",
            Self::Cross => "cross",
            Self::Normalize => "normalize",
            Self::Length => "length",
            Self::Distance => "distance",
            Self::Reflect => "reflect",
            Self::Mix => "mix",
            Self::Step => "step",
            Self::SmoothStep => "smoothstep",
        }
    }

    /// Number of arguments the function takes.
    pub fn arg_count(self) -> usize {
        match self {
            Self::Abs
            | Self::Floor
            | Self::Ceil
            | Self::Round
            | Self::Fract
            | Self::Sin
            | Self::Cos
            | Self::Tan
            | Self::Asin
            | Self::Acos
            | Self::Atan
            | Self::Sqrt
            | Self::InverseSqrt
            | Self::Log
            | Self::Log2
            | Self::Exp
            | Self::Exp2
            | Self::Normalize
            | Self::Length => 1,
            Self::Min
            | Self::Max
            | Self::Mod
            | Self::Pow
            | Self::Dot
            | Self::Cross
            | Self::Distance
            | Self::Reflect
            | Self::Step => 2,
            Self::Clamp | Self::Mix | Self::SmoothStep => 3,
        }
    }
}

/// A single swizzle component.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SwizzleComponent {
    X = 0,
    Y = 1,
    Z = 2,
    W = 3,
}

impl SwizzleComponent {
    /// Parses a component letter from either the `xyzw` or `rgba` set.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'x' | 'r' => Some(Self::X),
            'y' | 'g' => Some(Self::Y),
            'z' | 'b' => Some(Self::Z),
            'w' | 'a' => Some(Self::W),
            _ => None,
        }
    }

    /// The `xyzw`-set letter for this component.
    pub fn letter(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
            Self::W => 'w',
        }
    }
}

/// A swizzle pattern of one to four components.
///
/// A single-component pattern selects a scalar; longer patterns select a
/// vector of the pattern's length.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SwizzlePattern {
    pub components: Vec<SwizzleComponent>,
}

impl SwizzlePattern {
    /// Parses a pattern like `"xyz"` or `"rgba"`.
    ///
    /// # Panics
    ///
    /// Panics on an empty pattern, more than four components, or a letter
    /// outside the `xyzw`/`rgba` sets.
    pub fn parse(pattern: &str) -> Self {
        assert!(
            !pattern.is_empty() && pattern.len() <= 4,
            "swizzle pattern `{pattern}` must have 1 to 4 components"
        );
        let components = pattern
            .chars()
            .map(|c| {
                SwizzleComponent::from_char(c)
                    .unwrap_or_else(|| panic!("invalid swizzle component `{c}` in `{pattern}`"))
            })
            .collect();
        Self { components }
    }

    /// Returns `true` for a single-component (scalar-producing) pattern.
    pub fn is_component(&self) -> bool {
        self.components.len() == 1
    }

    /// The GLSL postfix spelling, e.g. `xyz`.
    pub fn glsl_postfix(&self) -> String {
        self.components.iter().map(|c| c.letter()).collect()
    }
}

/// The target of a call expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callee {
    /// A user-defined procedure.
    Proc(Handle<crate::program::ProcDef>),
    /// A built-in math function.
    Math(MathFunction),
    /// Texture sampling: `texture(sampler, coords)`.
    Texture,
    /// A conversion/constructor call, spelled `T(args)` in GLSL.
    Construct(Handle<Type>),
}

/// An expression node: a kind, its canonical type, and an optional
/// source location.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Handle<Type>,
    pub loc: Option<SourceLoc>,
}

/// The tagged sum of expression kinds accepted by the compiler.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// A literal constant.
    Literal(Literal),
    /// A reference to a resolved symbol.
    SymbolRef(Handle<Symbol>),
    /// Dot access to a record field.
    Member {
        base: Handle<Expr>,
        field: Handle<Symbol>,
    },
    /// Vector component selection.
    Swizzle {
        base: Handle<Expr>,
        pattern: SwizzlePattern,
    },
    /// Bracket indexing into an array, vector, or matrix.
    Index {
        base: Handle<Expr>,
        index: Handle<Expr>,
    },
    /// A prefix operator application.
    Unary { op: UnaryOp, expr: Handle<Expr> },
    /// An infix operator application.
    Binary {
        op: BinaryOp,
        left: Handle<Expr>,
        right: Handle<Expr>,
    },
    /// An if-expression, lowered to a ternary chain.
    Select {
        condition: Handle<Expr>,
        accept: Handle<Expr>,
        reject: Handle<Expr>,
    },
    /// A call: user procedure, math builtin, texture sample, or constructor.
    Call {
        callee: Callee,
        args: Vec<Handle<Expr>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_scalars() {
        assert_eq!(Literal::F32(1.0).scalar(), Scalar::F32);
        assert_eq!(Literal::I32(-1).scalar(), Scalar::I32);
        assert_eq!(Literal::U32(42).scalar(), Scalar::U32);
        assert_eq!(Literal::Bool(true).scalar(), Scalar::BOOL);
    }

    #[test]
    fn swizzle_parse_both_alphabets() {
        let xyz = SwizzlePattern::parse("xyz");
        let rgb = SwizzlePattern::parse("rgb");
        assert_eq!(xyz, rgb);
        assert_eq!(xyz.glsl_postfix(), "xyz");
        assert!(!xyz.is_component());
        assert!(SwizzlePattern::parse("r").is_component());
    }

    #[test]
    #[should_panic(expected = "invalid swizzle component")]
    fn swizzle_rejects_bad_letter() {
        SwizzlePattern::parse("xq");
    }

    #[test]
    fn math_function_spellings() {
        assert_eq!(MathFunction::InverseSqrt.glsl_name(), "inversesqrt");
        assert_eq!(MathFunction::SmoothStep.glsl_name(), "smoothstep");
        assert_eq!(MathFunction::Mod.glsl_name(), "mod");
        assert_eq!(MathFunction::Mix.arg_count(), 3);
        assert_eq!(MathFunction::Dot.arg_count(), 2);
        assert_eq!(MathFunction::Normalize.arg_count(), 1);
    }

    #[test]
    fn comparison_classification() {
        assert!(BinaryOp::Less.is_comparison());
        assert!(BinaryOp::Equal.is_comparison());
        assert!(!BinaryOp::Add.is_comparison());
        assert!(!BinaryOp::LogicalAnd.is_comparison());
    }
}
