//! Vitrine API Library
//!
//! HTTP surface for chunked gallery uploads: the chunk endpoint, the gallery finalize
//! endpoint, health and the OpenAPI document, plus application setup.

pub mod api_doc;
pub mod constants;
pub mod error;
mod handlers;
pub mod response;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use handlers::gallery::FinalizeRequest;
