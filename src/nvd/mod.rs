//! NVD CVE 2.0 API client.
//!
//! Concrete [`VulnerabilitySearch`](crate::capabilities::VulnerabilitySearch)
//! used to ground hypothesis generation in published vulnerabilities.

mod client;
mod types;

pub use client::NvdClient;
pub use types::*;
