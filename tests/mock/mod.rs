//! Mock-based tests against a simulated Cloudflare API.
//!
//! These tests use wiremock to simulate API responses without hitting real APIs.
//! Each layer has its own module, from the raw client up to the HTTP routes.

pub mod dns;
