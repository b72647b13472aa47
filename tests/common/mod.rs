//! Integration test common infrastructure.
//!
//! Provides a recording remote console, fixture builders and a harness
//! wiring an in-memory store, a fixed clock and the default registry.

pub mod console;
pub mod fixtures;

#[allow(unused_imports)]
pub use console::{ConsoleLog, RecordingConsoles};
#[allow(unused_imports)]
pub use fixtures::{ACCOUNT_ID, Harness, NOW, STEAM2, connection, server, user};
