pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRoomStore;
pub use sqlite::SqliteRoomStore;
