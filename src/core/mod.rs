pub mod error;
pub mod types;
pub mod value;

pub use error::{PermError, Result};
pub use types::{Field, FieldKind};
pub use value::Value;
