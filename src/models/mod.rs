pub mod blob;
pub mod conversion;

pub use blob::*;
pub use conversion::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp for storage.
/// Fixed-width UTC form so that string order in SQL matches time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
