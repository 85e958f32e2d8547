//! Repository port and its SQLite implementation.

pub mod sqlite;
pub mod traits;

pub use sqlite::{SqliteBookmarkStore, SqliteFaviconStore};
pub use traits::{BookmarkRepository, BookmarkStore, FaviconRepository};
