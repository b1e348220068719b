pub mod memory;
pub mod postgres;
pub mod record;
pub mod traits;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use record::{Record, SortKey};
pub use traits::{EntityStore, ListOptions, StorageError};
