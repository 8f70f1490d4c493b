//! Query DTOs - Query string parameters

use crate::entities::{TaskPriority, TaskStatus};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer};

/// `GET /tasks?status=In%20Progress&priority=High`
///
/// An empty value or `All` means no filter on that field.
#[derive(Deserialize, Debug, Default)]
pub struct TaskListQuery {
    #[serde(default, deserialize_with = "optional_filter")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "optional_filter")]
    pub priority: Option<TaskPriority>,
}

fn optional_filter<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() || raw == "All" => Ok(None),
        Some(raw) => T::deserialize(raw.as_str().into_deserializer()).map(Some),
    }
}
