use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::core::contract::{Envelope, ReturnContract};
use crate::core::error::LLFnError;
use crate::core::examples::{Example, ExampleStore};
use crate::core::parser::ResultParser;
use crate::core::prompt::{PromptCompiler, PromptMessage};
use crate::core::registry::{FunctionConfig, RegistryState};
use crate::core::telemetry::{CallTrace, Telemetry};
use crate::llm::{Backend, BackendDispatcher};

type PromptFn<A> = Box<dyn Fn(A) -> String + Send + Sync>;

/// A prompt-generating function bound to a return contract.
///
/// Calling it renders the instruction from `A`, sends it to the resolved backend
/// together with the recorded examples, and returns the validated `T`.
///
/// The function exclusively owns its examples and its backend override. Mutation
/// goes through `&mut self`, so sharing one function across threads needs the
/// caller's own synchronization.
pub struct BoundFunction<A, T> {
    name: String,
    prompt: PromptFn<A>,
    contract: ReturnContract<T>,
    examples: ExampleStore,
    compiler: PromptCompiler,
    backend: Option<Backend>,
    registry: Weak<RegistryState>,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl<A, T> BoundFunction<A, T> {
    /// Start building a function that is not attached to any registry.
    pub fn builder() -> FunctionBuilder<A, T> {
        FunctionBuilder::new(Weak::new(), FunctionConfig::default(), None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self) -> &ReturnContract<T> {
        &self.contract
    }

    /// Recorded examples in replay order.
    pub fn examples(&self) -> &[Example] {
        self.examples.all()
    }

    /// Override the registry's default backend for this function.
    pub fn bind(&mut self, backend: Backend) {
        log::debug!("bound `{}` to a {} backend", self.name, backend.convention());
        self.backend = Some(backend);
    }

    /// Drop the per-function override, falling back to the registry default.
    pub fn unbind(&mut self) -> Option<Backend> {
        self.backend.take()
    }

    /// The backend a call would use right now: the function's own, else the
    /// registry default, else a configuration error.
    pub fn resolve_backend(&self) -> Result<Backend, LLFnError> {
        if let Some(backend) = &self.backend {
            return Ok(backend.clone());
        }
        self.registry
            .upgrade()
            .and_then(|registry| registry.default_backend())
            .ok_or_else(|| {
                LLFnError::Configuration(format!(
                    "You must call `bind` before calling `{}`",
                    self.name
                ))
            })
    }

    /// The exact message sequence a call with `args` would send.
    pub fn messages(&self, args: A) -> Vec<PromptMessage> {
        let user_prompt = (self.prompt)(args);
        self.compiler
            .compile(&self.contract, self.examples.all(), &user_prompt)
    }

    fn trace(
        &self,
        backend: &Backend,
        prompt: &str,
        output: Option<&str>,
        error: Option<&LLFnError>,
    ) {
        let Some(telemetry) = &self.telemetry else {
            return;
        };
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        telemetry.record(CallTrace {
            timestamp,
            function: self.name.clone(),
            contract_id: self.contract.id().to_string(),
            convention: backend.convention(),
            prompt: prompt.to_string(),
            output: output.map(str::to_string),
            error: error.map(|e| e.to_string()),
            metadata: HashMap::from([
                ("examples".to_string(), self.examples.len().to_string()),
                (
                    "result_type".to_string(),
                    self.contract.type_name().to_string(),
                ),
            ]),
        });
    }
}

impl<A, T: Serialize> BoundFunction<A, T> {
    /// Render the prompt for `args` and return a [`Recorder`] for its expected result.
    ///
    /// The prompt comes from the same function a live call uses, so the recorded
    /// example is byte-identical to what `call(args)` would send.
    pub fn expect(&mut self, args: A) -> Recorder<'_, T> {
        let prompt = (self.prompt)(args);
        Recorder {
            prompt,
            contract: &self.contract,
            store: &mut self.examples,
        }
    }
}

impl<A, T: DeserializeOwned> BoundFunction<A, T> {
    pub fn call(&self, args: A) -> Result<T, LLFnError> {
        let backend = self.resolve_backend()?;
        let user_prompt = (self.prompt)(args);
        let messages = self
            .compiler
            .compile(&self.contract, self.examples.all(), &user_prompt);
        log::debug!(
            "calling `{}` with {} recorded examples",
            self.name,
            self.examples.len()
        );

        let raw = match BackendDispatcher::dispatch(&backend, &messages) {
            Ok(raw) => raw,
            Err(err) => {
                self.trace(&backend, &user_prompt, None, Some(&err));
                return Err(err);
            }
        };

        let parsed = ResultParser::parse(&self.contract, &raw);
        self.trace(&backend, &user_prompt, Some(&raw), parsed.as_ref().err());
        parsed
    }
}

impl<A, T> fmt::Debug for BoundFunction<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFunction")
            .field("name", &self.name)
            .field("contract", &self.contract)
            .field("examples", &self.examples.len())
            .field("backend", &self.backend)
            .finish()
    }
}

/// Stores the expected result for one recorded prompt.
#[must_use = "nothing is recorded until `returns` is called"]
pub struct Recorder<'a, T> {
    prompt: String,
    contract: &'a ReturnContract<T>,
    store: &'a mut ExampleStore,
}

impl<'a, T: Serialize> Recorder<'a, T> {
    /// The rendered example prompt.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Record `expected` as the answer to this prompt. Bare values are wrapped
    /// into the envelope.
    pub fn returns(self, expected: impl Into<Envelope<T>>) -> Result<(), LLFnError> {
        self.store.add(self.contract, self.prompt, expected)
    }
}

/// Builder for [`BoundFunction`]s.
pub struct FunctionBuilder<A, T> {
    registry: Weak<RegistryState>,
    name: Option<String>,
    prompt: Option<PromptFn<A>>,
    config: FunctionConfig,
    backend: Option<Backend>,
    telemetry: Option<Arc<dyn Telemetry>>,
    _returns: PhantomData<fn() -> T>,
}

impl<A, T> FunctionBuilder<A, T> {
    pub(crate) fn new(
        registry: Weak<RegistryState>,
        config: FunctionConfig,
        telemetry: Option<Arc<dyn Telemetry>>,
    ) -> Self {
        Self {
            registry,
            name: None,
            prompt: None,
            config,
            backend: None,
            telemetry,
            _returns: PhantomData,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The function that renders the instruction text from the call arguments.
    pub fn prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(A) -> String + Send + Sync + 'static,
    {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Description of the envelope's `result` field.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.result_description = description.into();
        self
    }

    pub fn default_examples(mut self, enabled: bool) -> Self {
        self.config.default_examples = enabled;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

impl<A, T: JsonSchema> FunctionBuilder<A, T> {
    pub fn build(self) -> Result<BoundFunction<A, T>, LLFnError> {
        let name = self.name.unwrap_or_else(|| {
            let id = format!("llfn_{}", uuid::Uuid::new_v4().simple());
            log::debug!("Auto-generated function name '{}'", id);
            id
        });
        let prompt = self.prompt.ok_or_else(|| {
            LLFnError::Configuration(format!("`{}` has no prompt function", name))
        })?;
        let contract = ReturnContract::with_description(self.config.result_description)?;

        Ok(BoundFunction {
            name,
            prompt,
            contract,
            examples: ExampleStore::new(),
            compiler: PromptCompiler::new().with_default_examples(self.config.default_examples),
            backend: self.backend,
            registry: self.registry,
            telemetry: self.telemetry,
        })
    }
}
