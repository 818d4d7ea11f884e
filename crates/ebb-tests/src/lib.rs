//! Integration test suite for the Ebb vault engine.
//!
//! Drives a full vault against the in-memory ledgers, factory and manual
//! clock. Scenario tests walk through complete lock/epoch/claim lifecycles,
//! adversarial tests try to double-spend, re-enter and bypass roles, and
//! invariant tests check bookkeeping under randomized operation sequences.

pub mod helpers;
