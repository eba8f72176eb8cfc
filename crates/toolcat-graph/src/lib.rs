//! Microsoft Graph access for toolcat.
//!
//! - [`auth`]: identity-platform credentials (app-only client secret,
//!   delegated device code, static token)
//! - [`GraphClient`]: typed calls for mail, calendar, contacts, To Do,
//!   Planner, OneDrive, and SharePoint
//! - [`report`]: one-line-per-record text extracts built on the client
//!
//! ```no_run
//! use toolcat_core::Config;
//! use toolcat_graph::{GraphClient, report};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_resolved()?;
//! let client = GraphClient::from_config(&config.graph, None)?;
//! for line in report::email_metadata(&client).await? {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod client;
pub mod report;
pub mod types;

pub use auth::{AccessToken, AuthError, StaticToken, TokenCredential};
pub use client::{DEFAULT_GRAPH_ENDPOINT, GraphClient, GraphError, Principal};
