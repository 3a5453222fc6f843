//! Test doubles shared by unit tests and downstream integration tests
//! (enabled with the `testing` feature).

mod fixtures;

pub use fixtures::{update, FakeConnector, FixedClock, ServerEnd};
