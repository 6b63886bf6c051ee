//! Shared test utilities for claimflow integration tests.
//!
//! This module provides:
//! - `ClaimHarness` for isolated end-to-end runs with temp directories
//! - Plain-file stand-ins for the conversion and recognition stages

pub mod harness;

pub use harness::ClaimHarness;
