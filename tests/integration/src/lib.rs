//! Integration test utilities for the platform client
//!
//! Provides a scripted in-process gateway, a stub API server and shared
//! fixtures for end-to-end tests of the session, transport and push endpoint.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
