//! Core types for toolcat: the named-function dispatch catalog and shared
//! configuration.
//!
//! A decision-maker (typically a function-calling language model) is shown
//! every [`FunctionSpec`] in a [`Catalog`], picks one by name, and supplies
//! arguments. The catalog resolves that [`DispatchRequest`] to its handler,
//! extracts the declared arguments, and returns a [`DispatchOutcome`].
//!
//! # Key Components
//!
//! - **Declarations**: [`FunctionSpec`], [`ParameterSchema`], [`ParameterSpec`]
//! - **Catalog**: [`Catalog`] with [`FunctionHandler`] implementations
//! - **Arguments**: typed extraction through [`Arguments`]
//! - **Configuration**: `toolcat.toml` via [`Config`]
//!
//! # Thread Safety
//!
//! Registration needs `&mut Catalog`. Once built, wrap the catalog in
//! `std::sync::Arc` and dispatch from any number of tasks.

mod arguments;
mod catalog;
pub mod config;
mod dispatch;
mod error;
mod schema;

pub use arguments::Arguments;
pub use catalog::{ArgumentPolicy, Catalog, FunctionHandler};
pub use config::{Config, ConfigError};
pub use dispatch::{DispatchOutcome, DispatchRequest};
pub use error::CatalogError;
pub use schema::{FunctionSpec, ParamType, ParameterSchema, ParameterSpec};
