//! Errors and protocol types shared between the `keyroll` service and its clients.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
