//! Catalogs shipped with toolcat.
//!
//! | Catalog       | Functions act on                                   |
//! |---------------|----------------------------------------------------|
//! | [`lights`]    | a simulated room light, no I/O                     |
//! | [`interact`]  | the REST backend's `POST /interact` endpoint       |
//! | [`directory`] | Microsoft Graph directly through a [`GraphClient`] |
//!
//! [`GraphClient`]: toolcat_graph::GraphClient

pub mod directory;
pub mod interact;
pub mod lights;

pub use directory::directory_catalog;
pub use interact::{
    InteractAction, InteractClient, InteractError, InteractRequest, interact_catalog,
};
pub use lights::lights_catalog;
