//! # llfn
//!
//! Typed prompt functions. A prompt function renders a natural-language
//! instruction from its arguments; its declared return type becomes a structural
//! contract the backend's output must satisfy. Calling the function sends the
//! instruction, validates the raw text against the contract and hands back the
//! typed value instead of text.
//!
//! ## Features
//!
//! - **Return contracts**: any `JsonSchema` type, scalar or struct, wrapped in a `{"result": ...}` envelope
//! - **Few-shot examples**: recorded with `expect(args).returns(value)` and replayed in insertion order
//! - **Two backend conventions**: chat models and single-text completion models behind one call
//! - **Unambiguous failures**: malformed JSON and wrong shapes are distinct errors, never a silent default
//! - **Optional Ollama backends**: behind the `llm` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use llfn::prelude::*;
//!
//! let registry = Registry::new();
//! let mut predict_animal: BoundFunction<&str, String> = registry
//!     .function(|text: &str| format!("What animal fits the following description the best: {text}"))?;
//!
//! predict_animal.expect("It has four legs and barks").returns("obviously a dog".to_string())?;
//! predict_animal.expect("It has four legs and meows").returns("obviously a cat".to_string())?;
//!
//! registry.bind(Backend::from_model(OllamaChat::default())?);
//! let answer = predict_animal.call("It has two legs and flies")?; // "obviously a bird"
//! ```
//!
//! ## Module Organization
//!
//! - [`core`](crate::core): contracts, examples, prompt compilation, parsing, bound functions and the registry
//! - [`llm`]: backend capability traits, dispatch and (feature `llm`) the Ollama backends
//! - [`prelude`]: commonly used types (import with `use llfn::prelude::*`)

// ============================================================================
// Modules
// ============================================================================

pub mod core;
pub mod llm;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use crate::core::contract::{DEFAULT_RESULT_DESCRIPTION, Envelope, RESULT_FIELD, ReturnContract};
pub use crate::core::error::LLFnError;
pub use crate::core::examples::{Example, ExampleStore};
pub use crate::core::function::{BoundFunction, FunctionBuilder, Recorder};
pub use crate::core::parser::ResultParser;
pub use crate::core::prompt::{PromptCompiler, PromptMessage, Role};
pub use crate::core::registry::{FunctionConfig, Registry};
pub use crate::core::telemetry::{CallTrace, MemoryTelemetry, Telemetry};

pub use crate::llm::{
    Backend, BackendDispatcher, ChatCapable, CompletionCapable, Convention, LLMError,
    LanguageModel,
};

#[cfg(feature = "llm")]
pub use crate::llm::{OllamaChat, OllamaConfig, OllamaGenerate};

/// Everything needed to register, record and call prompt functions.
///
/// # Example
/// ```rust
/// use llfn::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        Backend, BoundFunction, ChatCapable, CompletionCapable, Envelope, LLFnError,
        LanguageModel, PromptMessage, Registry, Role,
    };

    #[cfg(feature = "llm")]
    pub use super::{OllamaChat, OllamaConfig, OllamaGenerate};
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
