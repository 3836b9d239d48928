//! Paid generative-model layer.
//!
//! A [`ModelCascade`] picks one profile from a weighted table, sends a
//! review prompt through a [`ModelTransport`], parses whatever comes back
//! into a verdict and prices the call from approximate token counts.

mod cascade;
mod profiles;
mod prompt;
mod response;
mod transport;

pub use cascade::ModelCascade;
pub use profiles::{approx_tokens, ModelProfile, ModelSelector};
pub use prompt::build_prompt;
pub use response::{parse_response, ParsedResponse, DEFAULT_CONFIDENCE, DEFAULT_EXPLANATION};
pub use transport::{AnthropicTransport, CompletionRequest, ModelTransport};
