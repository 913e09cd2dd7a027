//! Key-addressed filesystem view over a remote media asset store.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod model;
pub mod store;
pub mod util;

pub use config::Config;
pub use model::fs::{AssetError, ResourceType};
pub use store::{Adapter, AssetStore};
