use thiserror::Error;

use crate::llm::LLMError;

/// Errors raised while building or calling a prompt function.
///
/// Every variant is fatal to the call that produced it. Nothing is retried here;
/// retry and timeout policy belong to the backend.
#[derive(Debug, Error)]
pub enum LLFnError {
    /// No backend could be resolved, or the function was registered incompletely.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The model offers neither the chat nor the completion convention.
    #[error("Unsupported backend `{0}`: it is neither chat- nor completion-capable")]
    UnsupportedBackend(String),

    /// The backend output is not a JSON document.
    #[error("Backend output is not valid JSON: {source}")]
    ResultParse {
        output: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend output is JSON but does not fit the return contract.
    #[error("Backend output does not match the `{expected}` contract: {source}")]
    ResultType {
        expected: String,
        output: String,
        #[source]
        source: serde_json::Error,
    },

    /// The return contract itself is invalid for the declared type.
    #[error("Invalid return contract for `{type_name}`: {reason}")]
    Schema { type_name: String, reason: String },

    /// The backend failed before producing any output.
    #[error("Backend error: {0}")]
    Backend(#[from] LLMError),
}

impl LLFnError {
    /// The raw backend output attached to parse and type failures.
    pub fn output(&self) -> Option<&str> {
        match self {
            LLFnError::ResultParse { output, .. } | LLFnError::ResultType { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_is_kept_for_parse_failures() {
        let source = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err = LLFnError::ResultParse {
            output: "nope".to_string(),
            source,
        };
        assert_eq!(err.output(), Some("nope"));
        assert!(err.to_string().starts_with("Backend output is not valid JSON"));
    }

    #[test]
    fn test_backend_error_converts() {
        let err: LLFnError = LLMError::Provider("quota exceeded".to_string()).into();
        assert!(matches!(err, LLFnError::Backend(_)));
        assert_eq!(err.output(), None);
        assert_eq!(err.to_string(), "Backend error: Provider error: quota exceeded");
    }
}
