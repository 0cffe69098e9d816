//! Binary wire formats: primitive I/O, generic values and serialized operations.
//!
//! All integers are big-endian and fixed width.

mod data;
mod error;
mod io;
mod value;

pub use data::Data;
pub use error::{WireError, WireResult};
pub use io::{ObjectDataInput, ObjectDataOutput};
pub use value::ResultValue;
