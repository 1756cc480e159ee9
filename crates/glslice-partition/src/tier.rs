//! The execution-tier lattice and stage presence.

use std::fmt;

/// The execution site of a value or statement, totally ordered:
/// `Const < Cpu < Vs < Ts < Gs < Fs`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Tier {
    /// Compile-time constant, computable anywhere.
    Const,
    /// Computed once on the CPU per draw call.
    Cpu,
    /// Vertex stage.
    Vs,
    /// Tessellation stage.
    Ts,
    /// Geometry stage.
    Gs,
    /// Fragment stage.
    Fs,
}

impl Tier {
    /// Least upper bound of two tiers.
    pub fn join(self, other: Self) -> Self {
        self.max(other)
    }

    /// Greatest lower bound of two tiers.
    pub fn meet(self, other: Self) -> Self {
        self.min(other)
    }

    /// Returns `true` for tiers that execute on the GPU.
    pub fn is_shader_stage(self) -> bool {
        self >= Tier::Vs
    }

    /// The identifier prefix used for stage-local names.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Cpu => "cpu",
            Self::Vs => "vert",
            Self::Ts => "tess",
            Self::Gs => "geom",
            Self::Fs => "frag",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Const => "CONST",
            Self::Cpu => "CPU",
            Self::Vs => "VS",
            Self::Ts => "TS",
            Self::Gs => "GS",
            Self::Fs => "FS",
        })
    }
}

/// Per-compile pipeline configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Insert a (forwarding-only) geometry stage.
    pub geometry: bool,
    /// Insert tessellation stages. Representable in the lattice, but the
    /// driver rejects it: cross-patch semantics are not covered.
    pub tessellation: bool,
    /// Allow `texture(...)` in the vertex stage, lowering the sampling
    /// tier hint from FS to VS.
    pub vertex_texture_fetch: bool,
}

/// The set of stages present in this compile. VS and FS are always
/// present; GS and TS only by explicit configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSet {
    geometry: bool,
    tessellation: bool,
}

impl StageSet {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            geometry: config.geometry,
            tessellation: config.tessellation,
        }
    }

    /// Returns `true` if the tier executes in this pipeline. Non-shader
    /// tiers are always present.
    pub fn contains(self, tier: Tier) -> bool {
        match tier {
            Tier::Gs => self.geometry,
            Tier::Ts => self.tessellation,
            _ => true,
        }
    }

    /// The present shader stages, in execution order.
    pub fn shader_stages(self) -> Vec<Tier> {
        [Tier::Vs, Tier::Ts, Tier::Gs, Tier::Fs]
            .into_iter()
            .filter(|&t| self.contains(t))
            .collect()
    }

    /// The next present shader stage after `tier`, if any.
    pub fn next_stage(self, tier: Tier) -> Option<Tier> {
        self.shader_stages().into_iter().find(|&s| s > tier)
    }

    /// Consecutive pairs of present shader stages.
    pub fn boundaries(self) -> Vec<(Tier, Tier)> {
        let stages = self.shader_stages();
        stages.windows(2).map(|w| (w[0], w[1])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order() {
        assert!(Tier::Const < Tier::Cpu);
        assert!(Tier::Cpu < Tier::Vs);
        assert!(Tier::Vs < Tier::Ts);
        assert!(Tier::Ts < Tier::Gs);
        assert!(Tier::Gs < Tier::Fs);
    }

    #[test]
    fn join_and_meet() {
        assert_eq!(Tier::Const.join(Tier::Fs), Tier::Fs);
        assert_eq!(Tier::Vs.join(Tier::Cpu), Tier::Vs);
        assert_eq!(Tier::Vs.meet(Tier::Fs), Tier::Vs);
        assert_eq!(Tier::Const.meet(Tier::Const), Tier::Const);
    }

    #[test]
    fn shader_stage_classification() {
        assert!(!Tier::Const.is_shader_stage());
        assert!(!Tier::Cpu.is_shader_stage());
        assert!(Tier::Vs.is_shader_stage());
        assert!(Tier::Fs.is_shader_stage());
    }

    #[test]
    fn default_pipeline_is_vs_fs() {
        let stages = StageSet::from_config(&PipelineConfig::default());
        assert_eq!(stages.shader_stages(), vec![Tier::Vs, Tier::Fs]);
        assert_eq!(stages.boundaries(), vec![(Tier::Vs, Tier::Fs)]);
        assert_eq!(stages.next_stage(Tier::Vs), Some(Tier::Fs));
        assert_eq!(stages.next_stage(Tier::Fs), None);
        assert!(!stages.contains(Tier::Gs));
    }

    #[test]
    fn geometry_inserts_a_boundary() {
        let config = PipelineConfig {
            geometry: true,
            ..Default::default()
        };
        let stages = StageSet::from_config(&config);
        assert_eq!(stages.shader_stages(), vec![Tier::Vs, Tier::Gs, Tier::Fs]);
        assert_eq!(
            stages.boundaries(),
            vec![(Tier::Vs, Tier::Gs), (Tier::Gs, Tier::Fs)]
        );
        assert_eq!(stages.next_stage(Tier::Vs), Some(Tier::Gs));
    }

    #[test]
    fn stage_prefixes() {
        assert_eq!(Tier::Vs.prefix(), "vert");
        assert_eq!(Tier::Fs.prefix(), "frag");
        assert_eq!(Tier::Gs.prefix(), "geom");
    }
}
