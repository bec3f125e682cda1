//! Value layer for quarry
//!
//! Result cells and statement parameters are both `sea_query::Value`. This
//! module classifies them and converts them into Rust types.
//!
//! - **`ValueKind`** - logical kind of a declared column type or a cell
//! - **`TryGetable`** - safe extraction with a per-type NULL policy

pub mod try_getable;
pub mod types;

pub use try_getable::TryGetable;
pub use types::{is_null, ValueKind};
