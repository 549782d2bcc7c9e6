//! Return contracts: the structural envelope a backend's output must satisfy.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::core::error::LLFnError;
use crate::core::parser::ResultParser;

/// Name of the single field every envelope exposes.
pub const RESULT_FIELD: &str = "result";

/// Description attached to the envelope field unless configured otherwise.
pub const DEFAULT_RESULT_DESCRIPTION: &str = "The result of the instruction";

/// Single-field wrapper around a declared return type.
///
/// Scalars such as `String` or `i64` would otherwise be emitted as bare JSON
/// literals; wrapping gives every contract the same `{"result": ...}` object shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Envelope<T> {
    /// The result of the instruction
    pub result: T,
}

impl<T> Envelope<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }

    pub fn into_inner(self) -> T {
        self.result
    }
}

impl<T> From<T> for Envelope<T> {
    fn from(result: T) -> Self {
        Self::new(result)
    }
}

/// The structural contract derived from a declared return type `T`.
///
/// Derived once when a function is registered and never recomputed, so the
/// schema text and [`id`](Self::id) are fixed for the owner's lifetime.
pub struct ReturnContract<T> {
    type_name: &'static str,
    description: String,
    schema: Value,
    rendered: String,
    id: String,
    _returns: PhantomData<fn() -> T>,
}

impl<T: JsonSchema> ReturnContract<T> {
    /// Derive the contract with the default field description.
    pub fn derive() -> Result<Self, LLFnError> {
        Self::with_description(DEFAULT_RESULT_DESCRIPTION)
    }

    /// Derive the contract, attaching `description` to the `result` field.
    pub fn with_description(description: impl Into<String>) -> Result<Self, LLFnError> {
        let type_name = std::any::type_name::<T>();
        let description = description.into();
        let invalid = |reason: &str| LLFnError::Schema {
            type_name: type_name.to_string(),
            reason: reason.to_string(),
        };

        let generated = serde_json::to_value(schemars::schema_for!(Envelope<T>))
            .map_err(|e| invalid(&e.to_string()))?;
        let Value::Object(mut root) = generated else {
            return Err(invalid("envelope schema is not an object"));
        };
        root.remove("$schema");
        root.insert("title".to_string(), Value::String("Result".to_string()));

        {
            let property = result_property(&mut root)
                .ok_or_else(|| invalid("the `result` field accepts no value"))?;
            if property.get("type").and_then(Value::as_str) == Some("null") {
                return Err(invalid("the return type describes no value"));
            }
            property.remove("description");
        }

        // Descriptions stay out of the identity so rewording them keeps the contract.
        let id = structural_id(type_name, &root);

        if let Some(property) = result_property(&mut root) {
            property.insert("description".to_string(), Value::String(description.clone()));
        }

        let schema = Value::Object(root);
        let rendered = schema.to_string();
        log::debug!("derived return contract {} for `{}`", id, type_name);

        Ok(Self {
            type_name,
            description,
            schema,
            rendered,
            id,
            _returns: PhantomData,
        })
    }
}

impl<T> ReturnContract<T> {
    /// The textual schema embedded into system instructions.
    pub fn schema(&self) -> &str {
        &self.rendered
    }

    pub fn schema_value(&self) -> &Value {
        &self.schema
    }

    /// Stable structural identity of this contract.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn field(&self) -> &'static str {
        RESULT_FIELD
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn schema_error(&self, reason: impl Into<String>) -> LLFnError {
        LLFnError::Schema {
            type_name: self.type_name.to_string(),
            reason: reason.into(),
        }
    }
}

impl<T: Serialize> ReturnContract<T> {
    /// Serialize an envelope in the exact format [`parse`](Self::parse) accepts.
    pub fn serialize(&self, envelope: &Envelope<T>) -> Result<String, LLFnError> {
        serde_json::to_string(envelope).map_err(|e| self.schema_error(e.to_string()))
    }
}

impl<T: DeserializeOwned> ReturnContract<T> {
    /// Parse raw backend text and unwrap the envelope.
    pub fn parse(&self, raw: &str) -> Result<T, LLFnError> {
        ResultParser::parse(self, raw)
    }
}

impl<T> Clone for ReturnContract<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            description: self.description.clone(),
            schema: self.schema.clone(),
            rendered: self.rendered.clone(),
            id: self.id.clone(),
            _returns: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ReturnContract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnContract")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("schema", &self.rendered)
            .finish()
    }
}

fn result_property(root: &mut Map<String, Value>) -> Option<&mut Map<String, Value>> {
    let slot = root.get_mut("properties")?.get_mut(RESULT_FIELD)?;
    // `true` is the schema of an unconstrained value (e.g. serde_json::Value).
    if let Value::Bool(true) = slot {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

fn structural_id(type_name: &str, schema: &Map<String, Value>) -> String {
    let mut hasher = DefaultHasher::new();
    type_name.hash(&mut hasher);
    Value::Object(schema.clone()).to_string().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
