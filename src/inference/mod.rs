//! Inference Client: Gemini `generateContent` client for the assistant.
//!
//! This module handles all communication with the hosted model:
//! - Request/response shapes (`contents`, `parts`, function declarations)
//! - The `ModelCapability` seam the agent loop is generic over
//! - HTTP error classification (429 becomes `RateLimited`)
//! - Model configuration and API key resolution
//!
//! Switching the model is a config change, not a code change.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::{GeminiClient, ModelCapability};
pub use config::ModelConfig;
pub use errors::InferenceError;
pub use types::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, GenerateRequest, ModelResponse,
    Part, Role,
};
