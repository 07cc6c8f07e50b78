//! Metadata reported by the extraction tool.

use serde::{Deserialize, Deserializer, Serialize};

/// Subset of the extractor's info document the service relies on.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// Type tag (`video`, `playlist`, ...), absent for plain items.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Human readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extractor specific identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Collection members; unavailable members reported as `null` are skipped.
    #[serde(
        default,
        deserialize_with = "skip_null_entries",
        skip_serializing_if = "Option::is_none"
    )]
    pub entries: Option<Vec<Entry>>,
}

/// One member of a collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// Extractor specific identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Title, when the tool reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Metadata {
    /// Metadata describing a single item.
    #[must_use]
    pub fn item(title: impl Into<String>) -> Self {
        Self {
            kind: Some("video".to_string()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Metadata describing a collection of the given entry identifiers.
    #[must_use]
    pub fn collection<I, S>(title: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: Some("playlist".to_string()),
            title: Some(title.into()),
            id: None,
            entries: Some(
                ids.into_iter()
                    .map(|id| Entry {
                        id: Some(id.into()),
                        title: None,
                    })
                    .collect(),
            ),
        }
    }

    /// Number of collection members, zero for single items.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }
}

fn skip_null_entries<'de, D>(deserializer: D) -> Result<Option<Vec<Entry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<Entry>>>::deserialize(deserializer)?;
    Ok(raw.map(|entries| entries.into_iter().flatten().collect()))
}
