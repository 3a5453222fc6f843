//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing application services to interact with external systems without
//! depending on concrete implementations.

pub mod auth_port;
pub mod platform;
pub mod transport_port;
pub mod view_port;

pub use auth_port::AuthProvider;
pub use platform::ClockPort;
pub use transport_port::{
    InboundFrame, OutboundFrame, TransportConnector, TransportError, TransportLink,
};
pub use view_port::{ApplyError, UpdateObserver};

#[cfg(any(test, feature = "testing"))]
pub use auth_port::MockAuthProvider;
#[cfg(any(test, feature = "testing"))]
pub use platform::MockClockPort;
#[cfg(any(test, feature = "testing"))]
pub use view_port::MockUpdateObserver;
