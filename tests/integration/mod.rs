//! Live integration tests against Cloudflare.
//!
//! These tests require valid credentials and are ignored by default.
//!
//! # Running Tests
//!
//! 1. Create a `.env` file in the project root
//! 2. Run with: `cargo test -- --ignored`
