//! Test utilities shared by unit and HTTP-level tests.
//!
//! This module provides:
//! - Test data factories for creating valid fixtures
//! - In-memory repositories and a scripted processor client
//! - `TestAppStateBuilder` for exercising the router

mod app_state_builder;
mod billing_mocks;
mod factories;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use factories::*;
