//! HTTP surface of a ringkv node.
//!
//! This crate provides both sides of the wire:
//! - The public API clients use (`/data`, `/peers`, `/settings`, `/stats`)
//! - The internal API nodes use to replicate, route, read and exchange
//!   membership
//! - [`HttpTransport`], the [`replication::PeerTransport`] that calls it

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::HttpTransport;
pub use error::HttpError;
pub use protocol::{ExchangeRequest, ExchangeResponse, StatsResponse};
pub use server::{router, serve};
