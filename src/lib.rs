//! bass-api: Item and User CRUD over a REST API.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use error::{AppError, ConfigError};
pub use model::{EntityDef, ENTITIES, ITEM, USER};
pub use routes::{app, common_routes, entity_routes};
pub use service::CrudService;
pub use settings::{Settings, StorageConfig};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, MemoryStore, PgStore, Store};
