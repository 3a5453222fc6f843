//! Application layer: use cases built on the ports and the state module.

pub mod services;
