//! Deterministic configurations for tests.

use mipforge_config::SolverConfig;

/// Fixed seed, node limit as a safety net.
pub fn deterministic_config() -> SolverConfig {
    SolverConfig::default()
        .with_random_seed(7)
        .with_node_limit(10_000)
}

/// Deterministic configuration without primal heuristics.
pub fn quiet_config() -> SolverConfig {
    deterministic_config().without_heuristics()
}
