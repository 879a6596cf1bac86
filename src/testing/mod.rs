//! Testability harness utilities.
//!
//! Modules in this namespace are only compiled for unit tests or when the
//! `test_fixtures` Cargo feature is enabled, so the production build carries
//! neither the scripted transport nor the message builders.

pub mod builders;
pub mod scripted;

pub use scripted::{ConnectScript, ScriptStep, ScriptedTransport};
