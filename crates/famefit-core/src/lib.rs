//! # famefit-core
//!
//! FameFit domain models, port (trait) definitions and error types.
//! Every other crate in the workspace builds on the types defined here.
//!
//! ## Layout
//!
//! - [`models`] — domain data structures (serde Serialize/Deserialize)
//! - [`ports`] — hexagonal-architecture port interfaces (async_trait)
//! - [`error`] — core error type (thiserror)
//! - [`config`] — application configuration structs
//! - [`config_manager`] — config file management (load/save)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
