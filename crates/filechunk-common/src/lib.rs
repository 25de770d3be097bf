#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Shared HTTP plumbing for filechunk upload clients
//!
//! This crate holds the transport-level pieces used by the upload protocol: request
//! configuration, header authentication, raw body transmission and the header-safe
//! encoding applied to file names and identifiers.

pub mod encoding;
pub mod error;
pub mod request_builder;

pub use encoding::{EncodedHeader, HeaderEncoding, decode_header_text, encode_header_text};
pub use error::CommonRequestError;
pub use request_builder::{AuthMethod, Endpoint, RawResponse, RequestBuilder, RequestConfig};

/// Re-export common types for convenience
pub use bytes::Bytes;
pub use reqwest::StatusCode;
