//! Message sequences sent to a backend, and the compiler that builds them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::contract::ReturnContract;
use crate::core::examples::Example;

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Assistant,
}

impl Role {
    /// Label used when a conversation is flattened into a single transcript.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::Human => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A role-tagged unit of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Builds the deterministic message sequence for one call:
/// system instructions, then every example pair in store order, then the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptCompiler {
    default_examples: bool,
}

impl PromptCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Condition on a small built-in pair when no examples were recorded.
    pub fn with_default_examples(mut self, enabled: bool) -> Self {
        self.default_examples = enabled;
        self
    }

    pub fn compile<T>(
        &self,
        contract: &ReturnContract<T>,
        examples: &[Example],
        user_prompt: &str,
    ) -> Vec<PromptMessage> {
        let fallback;
        let examples = if examples.is_empty() && self.default_examples {
            fallback = default_examples();
            fallback.as_slice()
        } else {
            examples
        };

        let mut messages = Vec::with_capacity(examples.len() * 2 + 2);
        messages.push(PromptMessage::system(system_instructions(contract.schema())));
        for example in examples {
            messages.push(PromptMessage::human(example.prompt()));
            messages.push(PromptMessage::assistant(example.expected()));
        }
        messages.push(PromptMessage::human(user_prompt));
        messages
    }
}

fn system_instructions(schema: &str) -> String {
    format!(
        "- You MUST process the user's command and produce exactly one result without any other context or explanation\n\
         - Your output must be exactly one JSON document matching this JSON schema: {schema}\n\
         - Output format is EXTREMELY important. Reply with the JSON document only, no prose, no markdown."
    )
}

/// One scalar-result and one structured-result example.
fn default_examples() -> Vec<Example> {
    vec![
        Example::new(
            "What is the capital city of France?",
            r#"{"result":"Paris"}"#,
        ),
        Example::new(
            "Name the largest planet in the solar system and how many planets are closer to the sun.",
            r#"{"result":{"name":"Jupiter","closer_planets":4}}"#,
        ),
    ]
}
