pub mod backend;
pub mod error;
pub mod keys;

pub use crate::backend::StateStore;
pub use crate::keys::validate as validate_key;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn StateStore + Send + Sync>;
