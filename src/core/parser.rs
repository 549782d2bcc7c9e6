use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::error::Category;

use crate::core::contract::{Envelope, ReturnContract};
use crate::core::error::LLFnError;

/// Validates raw backend text against a return contract.
pub struct ResultParser;

impl ResultParser {
    /// Decode `raw` straight into the envelope and return the unwrapped `result`
    /// value.
    ///
    /// Malformed JSON fails with [`LLFnError::ResultParse`]; well-formed JSON of
    /// the wrong shape fails with [`LLFnError::ResultType`]. There is no fallback value.
    pub fn parse<T: DeserializeOwned>(
        contract: &ReturnContract<T>,
        raw: &str,
    ) -> Result<T, LLFnError> {
        let source = match serde_json::from_str::<Envelope<T>>(raw) {
            Ok(envelope) => return Ok(envelope.into_inner()),
            Err(source) => source,
        };

        // A shape error can surface before the tokenizer reaches a later syntax error.
        let source = match source.classify() {
            Category::Data => match serde_json::from_str::<IgnoredAny>(raw) {
                Ok(_) => {
                    log::warn!(
                        "backend output does not fit contract {} ({}): {}",
                        contract.id(),
                        contract.type_name(),
                        source
                    );
                    return Err(LLFnError::ResultType {
                        expected: contract.type_name().to_string(),
                        output: raw.to_string(),
                        source,
                    });
                }
                Err(syntax) => syntax,
            },
            Category::Syntax | Category::Eof | Category::Io => source,
        };

        log::warn!("backend output is not JSON: {}", source);
        Err(LLFnError::ResultParse {
            output: raw.to_string(),
            source,
        })
    }
}
