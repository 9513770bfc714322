//! Unit tests for core library types.
//!
//! These tests focus on configuration parsing, outcome merging and client
//! settings that don't require network access or mock servers.
