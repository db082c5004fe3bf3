#![forbid(unsafe_code)]

pub mod documents;
pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryKeyValueStore, KeyLayout, KeyValueStore, Revision, Storage, StorageError, WriteMode,
};
