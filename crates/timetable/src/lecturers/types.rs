/// Types for lecturer directory data
use crate::schedule::Weekday;
use crate::types::EntityId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A lecturer as listed by `GET /lecturers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecturerSummary {
    pub id: EntityId,

    #[serde(default)]
    pub name: String,

    /// Weekly days off. Unknown day names are dropped, `null` reads as none.
    #[serde(default, deserialize_with = "lenient_days")]
    pub day_offs: Vec<Weekday>,
}

impl LecturerSummary {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            day_offs: Vec::new(),
        }
    }

    /// Teaching days the lecturer is available on.
    pub fn available_days(&self) -> Vec<Weekday> {
        Weekday::ALL
            .into_iter()
            .filter(|day| !self.day_offs.contains(day))
            .collect()
    }

    pub fn is_available_all_days(&self) -> bool {
        self.day_offs.is_empty()
    }
}

/// Opaque pagination token issued by the server.
///
/// The directory endpoint currently hands out numeric offsets, but the client
/// never does arithmetic on them; they are only sent back as `next=`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Cursor(s)),
            serde_json::Value::Number(n) => Ok(Cursor(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "cursor must be a string or number, got {other}"
            ))),
        }
    }
}

/// One page of the lecturer directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow {
    pub items: Vec<LecturerSummary>,
    pub next: Option<Cursor>,
    pub prev: Option<Cursor>,
    /// Page size the page was requested with.
    pub limit: u32,
}

impl PageWindow {
    pub fn is_first(&self) -> bool {
        self.prev.is_none()
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Query for `GET /lecturers`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LecturerQuery {
    pub search: Option<String>,
    pub limit: u32,
    pub cursor: Option<Cursor>,
}

impl LecturerQuery {
    pub fn page(limit: u32, cursor: Option<Cursor>) -> Self {
        Self {
            search: None,
            limit,
            cursor,
        }
    }

    /// A first-page lookup; blank search text means no filter.
    pub fn search(text: &str, limit: u32) -> Self {
        let text = text.trim();
        Self {
            search: (!text.is_empty()).then(|| text.to_string()),
            limit,
            cursor: None,
        }
    }
}

/// Payload for `POST /lecturers`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLecturer {
    pub name: String,
    pub day_offs: Vec<Weekday>,
}

fn lenient_days<'de, D>(deserializer: D) -> Result<Vec<Weekday>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .iter()
        .filter_map(|v| v.as_str().and_then(Weekday::parse))
        .collect())
}
