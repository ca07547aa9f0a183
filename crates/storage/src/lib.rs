pub mod db;

pub use db::{create_db, get_records, mirror_confirmed, DbPool, MirroredRecord, StorageError};
