//! Stage inference and partitioning for the glslice compiler.
//!
//! Classifies every statement of a unified pipeline program into an
//! execution tier, validates the classification against the dependency
//! lattice, reorders statements into tier-grouped runs, and plans the
//! values crossing each stage boundary.

mod depgraph;
mod error;
mod partition;
mod plan_dump;
mod record;
mod tier;
mod varying;

pub use depgraph::{DepEdge, DependencyGraph, DependencyKind};
pub use error::PartitionError;
pub use partition::{partition, Crossing, PartitionPlan};
pub use plan_dump::dump_plan;
pub use record::{class_tier, collect, StmtFacts, VarId};
pub use tier::{PipelineConfig, StageSet, Tier};
pub use varying::{plan_varyings, var_scalar, BoundaryPlan, Varying, VaryingPlan};
