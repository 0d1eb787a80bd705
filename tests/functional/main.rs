// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests for the admission decision pipeline.
//!
//! These tests drive the production `AdmissionEngine` and webhook handler
//! WITHOUT a Kubernetes cluster or vulnerability scanner. Policy store,
//! metadata client, validator and violation strategy are replaced by mocks
//! that record every call.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_breakglass_skips_failing_collaborators
//!
//! # Run with verbose output
//! cargo test --test functional -- --nocapture
//! ```
//!
//! ## Test Categories
//!
//! - **Pipeline tests**: stage precedence and call-count assertions for each
//!   terminal state
//! - **Scenario tests**: concrete pods evaluated against the production
//!   vulnerability validator
//! - **Webhook tests**: raw AdmissionReview bodies in, HTTP replies out

#[path = "../common/fixtures.rs"]
mod fixtures;
mod mock_pipeline;

// Re-export for use in tests
pub use fixtures::*;
pub use mock_pipeline::*;
