//! Single item versus collection classification.

use crate::model::Metadata;

/// Shape of an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// One media item.
    Single,
    /// An ordered group of items such as a playlist.
    Collection,
}

impl Classification {
    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Collection => "collection",
        }
    }
}

/// Classify metadata: a collection carries `entries` or the `playlist` type tag.
#[must_use]
pub fn classify(metadata: &Metadata) -> Classification {
    if metadata.entries.is_some() || metadata.kind.as_deref() == Some("playlist") {
        Classification::Collection
    } else {
        Classification::Single
    }
}
