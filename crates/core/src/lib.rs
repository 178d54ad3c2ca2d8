//! # figmagen Core
//!
//! Request governor for the Figma REST API.
//!
//! This crate contains:
//! - [`governor::RequestGovernor`]: cache-first, rate-limited, throttle-aware
//!   fetching of design documents
//! - [`governor::Transport`]: the port the governor sends requests through
//! - [`http::HttpTransport`]: the reqwest-backed transport
//! - [`config`]: `GovernorConfig` and its file/environment loaders
//! - [`logging`]: tracing subscriber setup
//!
//! ## Architecture Principles
//! - Caching and rate limiting come from `figmagen-common`
//! - The network sits behind the `Transport` trait so the governor is
//!   testable without a server

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod governor;
pub mod http;
pub mod logging;

pub use config::GovernorConfig;
pub use governor::{
    parse_file_key, ApiRequest, ApiResponse, GovernorError, RequestGovernor, Transport,
    TransportError,
};
pub use http::HttpTransport;
