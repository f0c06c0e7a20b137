//! 블롭/레코드 저장소 구현.

pub mod fs;
pub mod memory;

pub use fs::{FsBlobStore, FsRecordStore};
pub use memory::{InMemoryBlobStore, InMemoryRecordStore};
