//! HTTP transport implementation for openrelay.
//!
//! One crate, one job: take a [`ChatRequest`], perform a single HTTP
//! exchange against an OpenAI-compatible `/chat/completions` endpoint, and
//! hand back the parsed [`ChatResponse`] or a classified
//! [`TransportError`]. Works with OpenRouter, OpenAI, and any compatible
//! endpoint.

mod http;

pub use http::HttpTransport;

#[doc(inline)]
pub use openrelay_core::transport::{ChatRequest, ChatResponse, Transport};
