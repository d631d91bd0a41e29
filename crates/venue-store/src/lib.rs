pub mod error;
pub mod json;
pub mod memory;
pub mod sink;
pub mod sqlite;

pub use error::StoreError;
pub use json::JsonFileSink;
pub use memory::LastKnownPrices;
pub use sink::RecordSink;
pub use sqlite::SqliteJournal;
