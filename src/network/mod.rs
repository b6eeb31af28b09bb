//! HTTP access for the weather and location services.
//!
//! Requests go through the [`HttpTransport`] trait so the services can be
//! exercised without a network.

pub mod http;

pub use http::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};

#[cfg(test)]
pub use http::fake;
