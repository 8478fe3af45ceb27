pub mod employees;
pub mod health;
pub mod reports;
pub mod tasks;

use serde::{Deserialize, Deserializer};

/// Distinguish "field absent" from "field: null" in PATCH bodies.
/// Absent → `None` (keep stored value); null → `Some(None)` (clear it).
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}
