//! Persistence layer — scoped key-value storage for flow records.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod property;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use memory::MemoryBackend;
pub use property::Property;
pub use traits::{Database, SettingEntry};
