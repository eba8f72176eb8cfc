//! Named-function dispatch catalog.
//!
//! A [`Catalog`] maps function names to a declaration ([`FunctionSpec`]) and
//! a handler. It is built once, then shared (typically via [`Arc`]) and used
//! to:
//!
//! - present every declaration to a decision-maker with
//!   [`Catalog::describe_all`], in registration order
//! - resolve the decision-maker's choice with [`Catalog::dispatch`], which
//!   extracts the declared arguments and invokes exactly one handler
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use toolcat_core::{Catalog, DispatchRequest, FunctionSpec, ParameterSchema, ParameterSpec};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), toolcat_core::CatalogError> {
//! let mut catalog = Catalog::new();
//! catalog.register_fn(
//!     FunctionSpec::new(
//!         "turn_on_light",
//!         "Turn on or off the room light",
//!         ParameterSchema::new().required("on", ParameterSpec::boolean("on or off")),
//!     ),
//!     |args| async move {
//!         let on: bool = args.required("on")?;
//!         anyhow::Ok(json!(if on { "Light turned on" } else { "Light turned off" }))
//!     },
//! )?;
//!
//! let request = DispatchRequest::new("turn_on_light", json!({"on": true}).as_object().cloned().unwrap());
//! let outcome = catalog.dispatch(request).await?;
//! assert_eq!(outcome.result, json!("Light turned on"));
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::{
    arguments::Arguments,
    dispatch::{DispatchOutcome, DispatchRequest},
    error::CatalogError,
    schema::FunctionSpec,
};

/// Behaviour bound to one declared function.
///
/// Handlers receive only the arguments their declaration names. A returned
/// error is wrapped in [`CatalogError::Invocation`] unless it already is a
/// [`CatalogError`] (for example from [`Arguments::required`]).
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    async fn invoke(&self, args: Arguments) -> anyhow::Result<Value>;
}

/// Adapts an async closure into a [`FunctionHandler`].
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> FunctionHandler for FnHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn invoke(&self, args: Arguments) -> anyhow::Result<Value> {
        (self.0)(args).await
    }
}

/// How strictly arguments are checked before a handler runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArgumentPolicy {
    /// Forward declared arguments as sent. Ranges, enums, and required
    /// markers are advisory and left to the handler or the remote service.
    #[default]
    PassThrough,
    /// Reject missing required arguments and type, range, or enum
    /// violations with [`CatalogError::MissingArgument`] or
    /// [`CatalogError::InvalidArgument`].
    Enforce,
}

struct CatalogEntry {
    spec: FunctionSpec,
    handler: Arc<dyn FunctionHandler>,
}

/// Registry of invocable functions keyed by name.
///
/// Registration takes `&mut self`; once built, the catalog is read-only and
/// `Send + Sync`, so it can be wrapped in [`Arc`] and dispatched from many
/// tasks.
#[derive(Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
    policy: ArgumentPolicy,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field(
                "functions",
                &self.entries.iter().map(|e| &e.spec.name).collect::<Vec<_>>(),
            )
            .field("policy", &self.policy)
            .finish()
    }
}

impl Catalog {
    /// Creates an empty catalog with the [`ArgumentPolicy::PassThrough`]
    /// policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: ArgumentPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn policy(&self) -> ArgumentPolicy {
        self.policy
    }

    /// Registers a function.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateName`] if the name is taken and
    /// [`CatalogError::InvalidSchema`] if the declaration requires a
    /// parameter it does not declare. The catalog is unchanged on failure.
    #[instrument(skip_all, fields(function = %spec.name))]
    pub fn register(
        &mut self,
        spec: FunctionSpec,
        handler: Arc<dyn FunctionHandler>,
    ) -> Result<(), CatalogError> {
        if self.index.contains_key(&spec.name) {
            return Err(CatalogError::DuplicateName(spec.name));
        }
        spec.parameters.validate(&spec.name)?;

        debug!(
            parameters = spec.parameters.properties.len(),
            "Registered function"
        );
        self.index.insert(spec.name.clone(), self.entries.len());
        self.entries.push(CatalogEntry { spec, handler });
        Ok(())
    }

    /// Registers a function backed by an async closure.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::register`].
    pub fn register_fn<F, Fut>(&mut self, spec: FunctionSpec, f: F) -> Result<(), CatalogError>
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(spec, Arc::new(FnHandler(f)))
    }

    /// Every declaration, in registration order.
    #[must_use]
    pub fn describe_all(&self) -> Vec<&FunctionSpec> {
        self.entries.iter().map(|e| &e.spec).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.index.get(name).map(|&i| &self.entries[i].spec)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `request` to its handler and invokes it once.
    ///
    /// Arguments not declared by the function are dropped before the handler
    /// sees them; the returned outcome still echoes the request's arguments.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::UnknownFunction`] if no such function is registered.
    ///   No handler runs.
    /// - [`CatalogError::MissingArgument`] / [`CatalogError::InvalidArgument`]
    ///   from argument extraction, or from policy checks under
    ///   [`ArgumentPolicy::Enforce`].
    /// - [`CatalogError::Invocation`] if the handler fails.
    #[instrument(skip_all, fields(function = %request.function_name))]
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome, CatalogError> {
        let Some(&i) = self.index.get(&request.function_name) else {
            warn!("Function not found");
            return Err(CatalogError::UnknownFunction(request.function_name));
        };
        let entry = &self.entries[i];
        let schema = &entry.spec.parameters;

        if self.policy == ArgumentPolicy::Enforce {
            schema.check_arguments(&entry.spec.name, &request.args)?;
        }

        let declared: Map<String, Value> = request
            .args
            .iter()
            .filter(|(name, _)| schema.declares(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let args = Arguments::new(entry.spec.name.clone(), declared);

        let result = entry
            .handler
            .invoke(args)
            .await
            .map_err(|e| match e.downcast::<CatalogError>() {
                Ok(catalog_err) => catalog_err,
                Err(source) => CatalogError::Invocation {
                    function: request.function_name.clone(),
                    source,
                },
            })?;

        info!("Dispatched function");
        Ok(DispatchOutcome {
            function_name: request.function_name,
            args: request.args,
            result,
        })
    }
}
