//! Shared test fixtures for MipForge crates.
//!
//! This crate provides small original-space problems and configurations.
//! It does NOT depend on `mipforge-solver` to avoid circular dependencies.
//!
//! - [`basic`] - tiny problems with a known outcome (infeasible, unbounded, optimal)
//! - [`knapsack`] - binary knapsack instances
//! - [`cover`] - set covering instances that need branching
//! - [`config`] - deterministic configurations for tests
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! mipforge-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use mipforge_test::knapsack::{knapsack, KnapsackItem};
//! use mipforge_test::config::quiet_config;
//! ```

pub mod basic;
pub mod config;
pub mod cover;
pub mod knapsack;

pub use basic::{chain_equality, infeasible_binary, root_optimal_cover, unbounded_continuous};
pub use config::{deterministic_config, quiet_config};
pub use cover::vertex_cover_triangle;
pub use knapsack::{knapsack, small_knapsack, KnapsackItem};
