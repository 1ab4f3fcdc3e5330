//! Configuration system for MipForge.
//!
//! Load solver configuration from TOML or YAML to control limits,
//! presolving, numerics, restarts and reoptimization without code changes.
//!
//! # Examples
//!
//! ```
//! use mipforge_config::SolverConfig;
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [limits]
//!     seconds_spent_limit = 30
//!     node_limit = 1000
//!
//!     [presolving]
//!     max_rounds = 5
//! "#).unwrap();
//!
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! assert_eq!(config.limits.node_limit, Some(1000));
//! assert_eq!(config.presolving.max_rounds, Some(5));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use mipforge_config::SolverConfig;
//!
//! let config = SolverConfig::load("mipforge.toml").unwrap_or_default();
//! assert!(config.presolving.enabled);
//! ```

use std::path::Path;
use std::time::Duration;

use mipforge_core::{MipError, Numerics};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for MipError {
    fn from(err: ConfigError) -> Self {
        MipError::Config(err.to_string())
    }
}

/// Main solver configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SolverConfig {
    /// Random seed for tie-breaking and concurrent instance diversification.
    pub random_seed: Option<u64>,
    pub limits: LimitsConfig,
    pub presolving: PresolvingConfig,
    pub numerics: NumericsConfig,
    pub misc: MiscConfig,
    pub lp: LpConfig,
    pub separating: SeparatingConfig,
    pub heuristics: HeuristicsConfig,
    pub reoptimization: ReoptimizationConfig,
    pub concurrent: ConcurrentConfig,
}

impl SolverConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.numerics;
        if !(n.feastol > 0.0 && n.epsilon > 0.0 && n.sum_epsilon > 0.0) {
            return Err(ConfigError::Invalid(
                "numerical tolerances must be positive".to_string(),
            ));
        }
        if n.infinity <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "infinity must exceed 1, got {}",
                n.infinity
            )));
        }
        if self.presolving.abort_fac < 0.0 || self.presolving.restart_fac < 0.0 {
            return Err(ConfigError::Invalid(
                "presolving factors must be non-negative".to_string(),
            ));
        }
        if self.limits.gap_limit.is_some_and(|g| g < 0.0) {
            return Err(ConfigError::Invalid("gap limit must be non-negative".to_string()));
        }
        if self.concurrent.solver_count == 0 {
            return Err(ConfigError::Invalid(
                "concurrent solver count must be at least 1".to_string(),
            ));
        }
        if self.misc.max_stored_sols == 0 {
            return Err(ConfigError::Invalid(
                "at least one solution must be storable".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the time limit in seconds.
    pub fn with_time_limit_seconds(mut self, seconds: u64) -> Self {
        self.limits.seconds_spent_limit = Some(seconds);
        self
    }

    /// Sets the node limit of one run.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.limits.node_limit = Some(nodes);
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the maximum number of presolving rounds.
    pub fn with_max_presolve_rounds(mut self, rounds: u32) -> Self {
        self.presolving.max_rounds = Some(rounds);
        self
    }

    /// Sets the root fixing fraction that triggers a restart.
    pub fn with_restart_fac(mut self, fac: f64) -> Self {
        self.presolving.restart_fac = fac;
        self
    }

    /// Enables reoptimization.
    pub fn with_reoptimization(mut self) -> Self {
        self.reoptimization.enabled = true;
        self
    }

    /// Disables all primal heuristics.
    pub fn without_heuristics(mut self) -> Self {
        self.heuristics.enabled = false;
        self
    }

    /// Sets the number of concurrent solver instances.
    pub fn with_concurrent_solvers(mut self, count: usize) -> Self {
        self.concurrent.solver_count = count;
        self
    }

    /// Returns the time limit, if configured.
    pub fn time_limit(&self) -> Option<Duration> {
        self.limits.time_limit()
    }

    /// Returns the tolerance set described by this configuration.
    pub fn numerics(&self) -> Numerics {
        self.numerics.to_numerics()
    }
}

/// Resource and result limits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LimitsConfig {
    /// Maximum seconds to spend solving.
    pub seconds_spent_limit: Option<u64>,

    /// Maximum milliseconds to spend solving, added to the seconds.
    pub milliseconds_spent_limit: Option<u64>,

    /// Maximum number of nodes in one run.
    pub node_limit: Option<u64>,

    /// Maximum number of nodes over all runs.
    pub total_node_limit: Option<u64>,

    /// Stop after this many stored solutions.
    pub solution_limit: Option<u64>,

    /// Stop after this many improving solutions.
    pub best_solution_limit: Option<u64>,

    /// Stop when the relative primal-dual gap falls to this value.
    pub gap_limit: Option<f64>,

    /// Estimated memory budget in megabytes.
    pub memory_limit_mb: Option<u64>,
}

impl LimitsConfig {
    /// Returns the time limit as a Duration, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        let millis = self.seconds_spent_limit.unwrap_or(0) * 1000
            + self.milliseconds_spent_limit.unwrap_or(0);
        if millis > 0 {
            Some(Duration::from_millis(millis))
        } else {
            None
        }
    }
}

/// Presolving and restart parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PresolvingConfig {
    /// Runs presolving plugins at all.
    pub enabled: bool,

    /// Maximum number of presolving rounds, unlimited when absent.
    pub max_rounds: Option<u32>,

    /// Relative reduction below which a tier counts as finished.
    pub abort_fac: f64,

    /// Fraction of integer variables fixed at the root that triggers a restart.
    pub restart_fac: f64,

    /// Maximum number of restarts, unlimited when absent.
    pub max_restarts: Option<u32>,

    /// Forbids multi-aggregation.
    pub donot_multaggr: bool,

    /// Forbids aggregation.
    pub donot_aggr: bool,
}

impl Default for PresolvingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rounds: None,
            abort_fac: 8e-4,
            restart_fac: 0.025,
            max_restarts: None,
            donot_multaggr: false,
            donot_aggr: false,
        }
    }
}

/// Numerical tolerances.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct NumericsConfig {
    pub infinity: f64,
    pub epsilon: f64,
    pub sum_epsilon: f64,
    pub feastol: f64,
    /// Minimal relative bound improvement to apply a tightening.
    pub boundstreps: f64,
}

impl Default for NumericsConfig {
    fn default() -> Self {
        let n = Numerics::default();
        Self {
            infinity: n.infinity,
            epsilon: n.epsilon,
            sum_epsilon: n.sumepsilon,
            feastol: n.feastol,
            boundstreps: n.boundstreps,
        }
    }
}

impl NumericsConfig {
    pub fn to_numerics(&self) -> Numerics {
        Numerics {
            infinity: self.infinity,
            epsilon: self.epsilon,
            sumepsilon: self.sum_epsilon,
            feastol: self.feastol,
            boundstreps: self.boundstreps,
        }
    }
}

/// Miscellaneous switches.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MiscConfig {
    /// Scales an integral objective to coprime integer coefficients.
    pub scale_obj: bool,

    /// Largest denominator tried when scaling the objective.
    pub scale_obj_max_denominator: u32,

    /// Keeps original-space candidate solutions for later runs.
    pub transfer_orig_sols: bool,

    /// Replaces infinite fixings in stored solutions by finite values.
    pub finite_sol_store: bool,

    /// Tracks the primal-dual integral.
    pub calc_integral: bool,

    /// Capacity of the primal solution store.
    pub max_stored_sols: usize,

    /// Allows reductions that may cut off optimal solutions with equal value.
    pub allow_dual_reds: bool,

    /// Objective limit in the user's space; solutions must be better.
    pub obj_limit: Option<f64>,
}

impl Default for MiscConfig {
    fn default() -> Self {
        Self {
            scale_obj: true,
            scale_obj_max_denominator: 1000,
            transfer_orig_sols: true,
            finite_sol_store: false,
            calc_integral: true,
            max_stored_sols: 100,
            allow_dual_reds: true,
            obj_limit: None,
        }
    }
}

/// Relaxation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LpConfig {
    /// Solves the LP relaxation at each node.
    pub enabled: bool,

    /// Consecutive LP errors after which a node is left unresolved.
    pub max_errors_per_node: u32,
}

impl Default for LpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_errors_per_node: 1,
        }
    }
}

/// Separation rounds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SeparatingConfig {
    pub max_rounds: u32,
    pub max_rounds_root: u32,
}

impl Default for SeparatingConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            max_rounds_root: 10,
        }
    }
}

/// Primal heuristics.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HeuristicsConfig {
    pub enabled: bool,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Reoptimization across related solves.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ReoptimizationConfig {
    pub enabled: bool,

    /// Solutions kept per run.
    pub max_saved_sols: usize,

    /// Stores open node paths at the end of a run.
    pub save_open_nodes: bool,
}

impl Default for ReoptimizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_saved_sols: 10,
            save_open_nodes: true,
        }
    }
}

/// Concurrent solving.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConcurrentConfig {
    /// Number of independent instances.
    pub solver_count: usize,

    /// Nodes between two synchronization polls.
    pub sync_node_freq: u64,
}

impl Default for ConcurrentConfig {
    fn default() -> Self {
        Self {
            solver_count: 2,
            sync_node_freq: 10,
        }
    }
}

#[cfg(test)]
mod tests;
