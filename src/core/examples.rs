use serde::Serialize;

use crate::core::contract::{Envelope, ReturnContract};
use crate::core::error::LLFnError;

/// A recorded few-shot pair: the instruction text and its serialized envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    prompt: String,
    expected: String,
}

impl Example {
    pub(crate) fn new(prompt: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expected: expected.into(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The expected output, already serialized as a full envelope.
    pub fn expected(&self) -> &str {
        &self.expected
    }
}

/// Ordered few-shot examples. Insertion order is replay order; nothing is
/// sorted or deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ExampleStore {
    examples: Vec<Example>,
}

impl ExampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an example. Bare values are wrapped into an envelope before storing.
    pub fn add<T: Serialize>(
        &mut self,
        contract: &ReturnContract<T>,
        prompt: impl Into<String>,
        result: impl Into<Envelope<T>>,
    ) -> Result<(), LLFnError> {
        let expected = contract.serialize(&result.into())?;
        let example = Example::new(prompt, expected);
        log::trace!(
            "recorded example #{}: {:?} -> {}",
            self.examples.len(),
            example.prompt,
            example.expected
        );
        self.examples.push(example);
        Ok(())
    }

    pub fn all(&self) -> &[Example] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
