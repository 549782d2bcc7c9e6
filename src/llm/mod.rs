//! Backend capabilities for llfn
//!
//! A backend is any text generator that speaks one of two conventions: a chat
//! model taking role-tagged messages, or a completion model taking a single text
//! blob. The convention is resolved once, when the [`Backend`] is built, and
//! [`BackendDispatcher`] hides the difference from callers.

pub mod error;
#[cfg(feature = "llm")]
pub mod ollama;

use std::fmt;
use std::sync::Arc;

use crate::core::error::LLFnError;
use crate::core::prompt::{PromptMessage, Role};

pub use error::LLMError;
#[cfg(feature = "llm")]
pub use ollama::{OllamaChat, OllamaConfig, OllamaGenerate};

/// A model that accepts an ordered conversation and returns one completion.
pub trait ChatCapable: Send + Sync {
    fn chat(&self, messages: &[PromptMessage]) -> Result<String, LLMError>;
}

/// A model that accepts a single text blob and returns one completion.
pub trait CompletionCapable: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, LLMError>;
}

/// A model whose calling convention is discovered at bind time.
///
/// Implementors opt into a convention by returning themselves from
/// [`into_chat`](Self::into_chat) or [`into_completion`](Self::into_completion).
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    fn into_chat(self: Arc<Self>) -> Option<Arc<dyn ChatCapable>> {
        None
    }

    fn into_completion(self: Arc<Self>) -> Option<Arc<dyn CompletionCapable>> {
        None
    }
}

/// The calling convention a backend was resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Convention {
    Chat,
    Completion,
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Convention::Chat => f.write_str("chat"),
            Convention::Completion => f.write_str("completion"),
        }
    }
}

/// A backend reference with its convention already resolved.
#[derive(Clone)]
pub enum Backend {
    Chat(Arc<dyn ChatCapable>),
    Completion(Arc<dyn CompletionCapable>),
}

impl Backend {
    pub fn chat(model: impl ChatCapable + 'static) -> Self {
        Backend::Chat(Arc::new(model))
    }

    pub fn completion(model: impl CompletionCapable + 'static) -> Self {
        Backend::Completion(Arc::new(model))
    }

    /// Resolve the convention of `model`. Chat wins when both are offered.
    pub fn from_model<M: LanguageModel + 'static>(model: M) -> Result<Self, LLFnError> {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<dyn LanguageModel>) -> Result<Self, LLFnError> {
        let name = model.name().to_string();
        let backend = if let Some(chat) = model.clone().into_chat() {
            Backend::Chat(chat)
        } else if let Some(completion) = model.into_completion() {
            Backend::Completion(completion)
        } else {
            return Err(LLFnError::UnsupportedBackend(name));
        };
        log::debug!("resolved backend `{}` as {}", name, backend.convention());
        Ok(backend)
    }

    pub fn convention(&self) -> Convention {
        match self {
            Backend::Chat(_) => Convention::Chat,
            Backend::Completion(_) => Convention::Completion,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Backend").field(&self.convention()).finish()
    }
}

/// Sends a compiled message sequence through whichever convention a backend speaks.
pub struct BackendDispatcher;

impl BackendDispatcher {
    pub fn dispatch(backend: &Backend, messages: &[PromptMessage]) -> Result<String, LLFnError> {
        log::debug!(
            "dispatching {} messages via {} backend",
            messages.len(),
            backend.convention()
        );
        let output = match backend {
            Backend::Chat(model) => model.chat(messages)?,
            Backend::Completion(model) => {
                let transcript = Self::flatten(messages);
                log::trace!("completion transcript:\n{}", transcript);
                model.complete(&transcript)?
            }
        };
        log::trace!("raw backend output: {}", output);
        Ok(output)
    }

    /// Render messages as a `"{Label}: {content}"` transcript ending in an empty assistant cue.
    pub fn flatten(messages: &[PromptMessage]) -> String {
        let mut lines: Vec<String> = messages
            .iter()
            .map(|message| format!("{}: {}", message.role.label(), message.content))
            .collect();
        lines.push(format!("{}:", Role::Assistant.label()));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoChat {
        seen: Mutex<Vec<PromptMessage>>,
    }

    impl ChatCapable for EchoChat {
        fn chat(&self, messages: &[PromptMessage]) -> Result<String, LLMError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(format!("{} messages", messages.len()))
        }
    }

    struct EchoCompletion;

    impl CompletionCapable for EchoCompletion {
        fn complete(&self, prompt: &str) -> Result<String, LLMError> {
            Ok(prompt.to_string())
        }
    }

    struct Both;

    impl ChatCapable for Both {
        fn chat(&self, _messages: &[PromptMessage]) -> Result<String, LLMError> {
            Ok("chat".to_string())
        }
    }

    impl CompletionCapable for Both {
        fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
            Ok("completion".to_string())
        }
    }

    impl LanguageModel for Both {
        fn name(&self) -> &str {
            "both"
        }

        fn into_chat(self: Arc<Self>) -> Option<Arc<dyn ChatCapable>> {
            Some(self)
        }

        fn into_completion(self: Arc<Self>) -> Option<Arc<dyn CompletionCapable>> {
            Some(self)
        }
    }

    struct CompletionOnly;

    impl CompletionCapable for CompletionOnly {
        fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
            Ok("completion".to_string())
        }
    }

    impl LanguageModel for CompletionOnly {
        fn name(&self) -> &str {
            "completion-only"
        }

        fn into_completion(self: Arc<Self>) -> Option<Arc<dyn CompletionCapable>> {
            Some(self)
        }
    }

    struct Embedder;

    impl LanguageModel for Embedder {
        fn name(&self) -> &str {
            "embedder"
        }
    }

    fn conversation() -> Vec<PromptMessage> {
        vec![
            PromptMessage::system("be terse"),
            PromptMessage::human("ping"),
            PromptMessage::assistant("pong"),
            PromptMessage::human("ping again"),
        ]
    }

    #[test]
    fn test_chat_receives_messages_natively() {
        let model = Arc::new(EchoChat {
            seen: Mutex::new(Vec::new()),
        });
        let backend = Backend::Chat(model.clone());
        let output = BackendDispatcher::dispatch(&backend, &conversation()).unwrap();
        assert_eq!(output, "4 messages");
        assert_eq!(*model.seen.lock().unwrap(), conversation());
    }

    #[test]
    fn test_completion_receives_flattened_transcript() {
        let backend = Backend::completion(EchoCompletion);
        let output = BackendDispatcher::dispatch(&backend, &conversation()).unwrap();
        assert_eq!(
            output,
            "System: be terse\nHuman: ping\nAssistant: pong\nHuman: ping again\nAssistant:"
        );
    }

    #[test]
    fn test_from_model_prefers_chat() {
        let backend = Backend::from_model(Both).unwrap();
        assert_eq!(backend.convention(), Convention::Chat);
        assert_eq!(
            BackendDispatcher::dispatch(&backend, &conversation()).unwrap(),
            "chat"
        );
    }

    #[test]
    fn test_from_model_completion_only() {
        let backend = Backend::from_model(CompletionOnly).unwrap();
        assert_eq!(backend.convention(), Convention::Completion);
    }

    #[test]
    fn test_from_model_unsupported() {
        let err = Backend::from_model(Embedder).unwrap_err();
        match err {
            LLFnError::UnsupportedBackend(name) => assert_eq!(name, "embedder"),
            other => panic!("expected UnsupportedBackend, got {other:?}"),
        }
    }

    #[test]
    fn test_backend_errors_propagate() {
        struct Down;
        impl ChatCapable for Down {
            fn chat(&self, _messages: &[PromptMessage]) -> Result<String, LLMError> {
                Err(LLMError::Provider("connection refused".to_string()))
            }
        }
        let err = BackendDispatcher::dispatch(&Backend::chat(Down), &conversation()).unwrap_err();
        assert!(matches!(err, LLFnError::Backend(LLMError::Provider(_))));
    }
}
