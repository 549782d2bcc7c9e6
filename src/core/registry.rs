use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::contract::DEFAULT_RESULT_DESCRIPTION;
use crate::core::error::LLFnError;
use crate::core::function::{BoundFunction, FunctionBuilder};
use crate::core::telemetry::Telemetry;
use crate::llm::Backend;

/// Defaults applied to every function a [`Registry`] constructs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    /// Description attached to the envelope's `result` field.
    pub result_description: String,
    /// Condition on a built-in example pair when nothing has been recorded.
    pub default_examples: bool,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            result_description: DEFAULT_RESULT_DESCRIPTION.to_string(),
            default_examples: false,
        }
    }
}

/// State that bound functions reach through a weak reference.
#[derive(Default)]
pub(crate) struct RegistryState {
    default_backend: RwLock<Option<Backend>>,
}

impl RegistryState {
    pub(crate) fn default_backend(&self) -> Option<Backend> {
        self.default_backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Holds the default backend and constructs [`BoundFunction`]s.
///
/// Functions keep only a weak reference back to the registry: binding a new
/// default later is seen by every function without an override, and dropping the
/// registry leaves those functions unbound rather than dangling.
#[derive(Default)]
pub struct Registry {
    state: Arc<RegistryState>,
    config: FunctionConfig,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FunctionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Record traces for every function constructed from now on.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &FunctionConfig {
        &self.config
    }

    /// Set the backend used by functions that have no override of their own.
    pub fn bind(&self, backend: Backend) {
        log::debug!("registry default backend set ({})", backend.convention());
        *self
            .state
            .default_backend
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(backend);
    }

    pub fn unbind(&self) -> Option<Backend> {
        self.state
            .default_backend
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn default_backend(&self) -> Option<Backend> {
        self.state.default_backend()
    }

    /// Start building a function whose return contract is `T`.
    pub fn builder<A, T>(&self) -> FunctionBuilder<A, T> {
        FunctionBuilder::new(
            Arc::downgrade(&self.state),
            self.config.clone(),
            self.telemetry.clone(),
        )
    }

    /// Register `prompt` with the return contract derived from `T`.
    pub fn function<A, T, F>(&self, prompt: F) -> Result<BoundFunction<A, T>, LLFnError>
    where
        T: JsonSchema,
        F: Fn(A) -> String + Send + Sync + 'static,
    {
        self.builder().prompt(prompt).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::PromptMessage;
    use crate::llm::{ChatCapable, Convention, CompletionCapable, LLMError};

    struct Fixed(&'static str);

    impl ChatCapable for Fixed {
        fn chat(&self, _messages: &[PromptMessage]) -> Result<String, LLMError> {
            Ok(self.0.to_string())
        }
    }

    impl CompletionCapable for Fixed {
        fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_registry_default_is_used() {
        let registry = Registry::new();
        let f: BoundFunction<&'static str, String> =
            registry.function(|text: &str| format!("echo {text}")).unwrap();
        assert!(f.call("x").is_err());

        registry.bind(Backend::chat(Fixed(r#"{"result":"from registry"}"#)));
        assert_eq!(f.call("x").unwrap(), "from registry");
    }

    #[test]
    fn test_function_override_wins() {
        let registry = Registry::new();
        registry.bind(Backend::chat(Fixed(r#"{"result":"from registry"}"#)));
        let mut f: BoundFunction<&'static str, String> =
            registry.function(|text: &str| text.to_string()).unwrap();
        f.bind(Backend::completion(Fixed(r#"{"result":"from function"}"#)));
        assert_eq!(f.call("x").unwrap(), "from function");
        assert_eq!(f.resolve_backend().unwrap().convention(), Convention::Completion);
    }

    #[test]
    fn test_dropped_registry_leaves_function_unbound() {
        let registry = Registry::new();
        registry.bind(Backend::chat(Fixed(r#"{"result":"x"}"#)));
        let f: BoundFunction<(), String> = registry.function(|_| "q".to_string()).unwrap();
        drop(registry);
        assert!(matches!(f.call(()), Err(LLFnError::Configuration(_))));
    }

    #[test]
    fn test_unbind() {
        let registry = Registry::new();
        registry.bind(Backend::chat(Fixed("{}")));
        assert!(registry.unbind().is_some());
        assert!(registry.default_backend().is_none());
    }

    #[test]
    fn test_config_defaults_flow_into_functions() {
        let registry = Registry::with_config(FunctionConfig {
            result_description: "The predicted animal".to_string(),
            default_examples: true,
        });
        let f: BoundFunction<(), String> = registry.function(|_| "q".to_string()).unwrap();
        assert_eq!(f.contract().description(), "The predicted animal");
        assert_eq!(f.messages(()).len(), 6);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: FunctionConfig = serde_json::from_str(r#"{"default_examples": true}"#).unwrap();
        assert!(config.default_examples);
        assert_eq!(config.result_description, DEFAULT_RESULT_DESCRIPTION);
    }
}
