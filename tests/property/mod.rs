//! Property-based tests for failover-cache.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold across all operations.

pub mod memory;
