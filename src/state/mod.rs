pub mod storage;

pub use storage::Storage;
