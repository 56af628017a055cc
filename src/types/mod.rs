//! Wire types for estimate requests and replies

pub mod request;
pub mod response;

pub use request::EstimateRequest;
pub use response::{ErrorResponse, EstimateResponse};
