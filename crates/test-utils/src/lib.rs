//! Shared test utilities for docbatch crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`strategies`] - Proptest generators for keys, paths, values and specs
//! - [`test_validation_config`] - Tight validation limits for boundary tests
//! - [`test_builder_config`] - Builder configuration using those limits

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

pub mod strategies;

mod config;
pub use config::{test_builder_config, test_validation_config};
