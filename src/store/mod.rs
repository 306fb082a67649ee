//! Generic keyed-record persistence
//!
//! [`PersistentDict`] keeps an ordered mapping in memory and commits it
//! atomically to a single file through one of the registered
//! [`Driver`]s. The format of an existing file is detected by trying
//! every driver in [`Format`] order.

pub mod driver;
pub mod error;
pub mod persistent;
pub mod value;

use indexmap::IndexMap;

/// The in-memory record mapping, in insertion order.
pub type Records = IndexMap<String, Value>;

pub use driver::{
    try_decode, CsvDriver, Driver, DriverRegistry, Format, JsonDriver, MsgPackDriver, Source,
};
pub use error::{DriverError, StoreError};
pub use persistent::{OpenMode, PersistentDict, StoreOptions};
pub use value::Value;
