//! Engine configuration.

/// Configurable parameters used during compilation.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Largest allowed correlation class size, in facts. A class of n facts
    /// materializes 2^n joint decision variables, so this bounds the worst
    /// case memory of a compilation. Values above 31 are clamped to 31, the
    /// widest class the u32 outcome index can address. (Default: 24)
    pub max_class_size: usize,

    /// Class size above which the joint-space blow-up is logged as a
    /// warning. (Default: 12)
    pub warn_class_size: usize,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            max_class_size: 24,
            warn_class_size: 12,
        }
    }
}
