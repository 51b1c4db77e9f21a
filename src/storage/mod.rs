pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use memory::MemoryLocalStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLocalStore;
pub use traits::LocalStore;
