//! HTTP gateway adapter.

mod client;
mod error;
mod streaming;
mod types;

pub use client::HttpGateway;
