pub mod adapter;
pub mod driver;
pub mod error;
pub mod storage;

pub mod cli;

pub use adapter::{Cache, CacheAdapter};
pub use driver::{Driver, Item};
pub use error::{CacheError, DriverError};
