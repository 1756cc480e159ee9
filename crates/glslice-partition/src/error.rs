//! Errors raised by the partitioning engine. All are fatal to the
//! compile; none is retried.

use glslice_ast::{DiagKind, Diagnostic, SourceLoc};

use crate::tier::Tier;

/// A partitioning failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// An input node kind, or a semantically ill-formed use of one, that
    /// the compiler does not accept.
    #[error("unsupported construct: {detail}")]
    UnsupportedConstruct {
        detail: String,
        loc: Option<SourceLoc>,
    },

    /// A symbol needs to hold different values at two stages with no
    /// user-authorized interpolation to bridge them.
    #[error("`{name}` is written at {written} but read at {read} with no interpolate override")]
    StageSplitConflict {
        name: String,
        written: Tier,
        read: Tier,
        loc: Option<SourceLoc>,
    },

    /// No statement order exists that both respects dependencies and
    /// groups statements into increasing-tier runs.
    #[error("no stage-ordered schedule exists: statement {earlier} ({earlier_tier}) must precede statement {later} ({later_tier})")]
    StageOrderConflict {
        earlier: usize,
        earlier_tier: Tier,
        later: usize,
        later_tier: Tier,
    },

    /// `interpolate` applied to something other than a whole scalar or
    /// vector variable.
    #[error("interpolate() requires a whole scalar or vector variable, got {detail}")]
    BadInterpolate {
        detail: String,
        loc: Option<SourceLoc>,
    },

    /// A symbol read with no resolved binding and no preceding write.
    #[error("unknown identifier `{name}`")]
    UnknownIdentifier {
        name: String,
        loc: Option<SourceLoc>,
    },

    /// An assertion failed inside the partitioner. Indicates a compiler
    /// bug, not a user error.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl PartitionError {
    /// The diagnostic kind for this error.
    pub fn kind(&self) -> DiagKind {
        match self {
            Self::UnsupportedConstruct { .. } => DiagKind::UnsupportedConstruct,
            Self::StageSplitConflict { .. } => DiagKind::StageSplitConflict,
            Self::StageOrderConflict { .. } => DiagKind::StageOrderConflict,
            Self::BadInterpolate { .. } => DiagKind::BadInterpolate,
            Self::UnknownIdentifier { .. } => DiagKind::UnknownIdentifier,
            Self::Internal(_) => DiagKind::InternalInvariantViolated,
        }
    }

    /// The source location, where one was available.
    pub fn loc(&self) -> Option<SourceLoc> {
        match self {
            Self::UnsupportedConstruct { loc, .. }
            | Self::StageSplitConflict { loc, .. }
            | Self::BadInterpolate { loc, .. }
            | Self::UnknownIdentifier { loc, .. } => *loc,
            _ => None,
        }
    }

    /// Renders this error as a diagnostic record.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind(), self.to_string()).with_loc(self.loc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_the_taxonomy() {
        let err = PartitionError::StageSplitConflict {
            name: "result_color".into(),
            written: Tier::Fs,
            read: Tier::Vs,
            loc: None,
        };
        assert_eq!(err.kind(), DiagKind::StageSplitConflict);
        assert!(err.to_string().contains("result_color"));

        let err = PartitionError::UnknownIdentifier {
            name: "tmp".into(),
            loc: Some(SourceLoc { line: 2, column: 5 }),
        };
        assert_eq!(err.kind(), DiagKind::UnknownIdentifier);
        assert_eq!(err.loc(), Some(SourceLoc { line: 2, column: 5 }));
        let diag = err.to_diagnostic();
        assert_eq!(diag.kind, DiagKind::UnknownIdentifier);
    }
}
