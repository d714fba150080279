//! Langbase Pipes HTTP client.
//!
//! The concrete LLM transport behind the hypothesis and report capabilities.

mod client;
mod types;

pub use client::*;
pub use types::*;
