//! Business logic services
//!
//! Decision logic lives here, separated from the collaborators it talks to,
//! so every branch can be driven by mocks in tests.

pub mod hostname;
pub mod manufacturing;
pub mod marker;
pub mod network;
pub mod password;
pub mod probe;
pub mod store;
