//! CrudService: generic CRUD through the serializer, plus the permission gate.

mod crud;
pub mod permission;
pub mod serializer;
pub use crud::CrudService;
pub use permission::authorize;
pub use serializer::{Mode, Serializer};
