//! Content-management collections (prayers, hymns, lessons).

use core::str::FromStr;

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};
use crate::id::DocumentId;
use crate::member::Fields;

/// The closed set of document collections the portal edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentCollection {
    Agbya,
    Taks,
    Coptic,
    Hymns,
    Test,
}

impl ContentCollection {
    pub const ALL: [ContentCollection; 5] = [
        ContentCollection::Agbya,
        ContentCollection::Taks,
        ContentCollection::Coptic,
        ContentCollection::Hymns,
        ContentCollection::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agbya => "agbya",
            Self::Taks => "taks",
            Self::Coptic => "coptic",
            Self::Hymns => "hymns",
            Self::Test => "test",
        }
    }

    /// Namespace the documents of this collection are stored under.
    ///
    /// Coptic lessons live in a fixed sub-collection of the `coptic` tree.
    pub fn storage_path(&self) -> &'static str {
        match self {
            Self::Coptic => "coptic/Hadana/firstYear",
            other => other.as_str(),
        }
    }

    /// Validate a new document and decide its id.
    ///
    /// Returns `Some(id)` when the id is taken from the payload (coptic) and
    /// `None` when the store should generate one.
    pub fn prepare_new(&self, data: &Fields) -> DomainResult<Option<DocumentId>> {
        match self {
            Self::Agbya => {
                validate_agbya(data)?;
                Ok(None)
            }
            Self::Coptic => match data.get("id") {
                Some(Value::String(id)) => DocumentId::parse(id.clone()).map(Some),
                _ => Err(DomainError::validation("id must be a string for coptic documents")),
            },
            _ => Ok(None),
        }
    }
}

impl core::fmt::Display for ContentCollection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCollection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(
                    "invalid collection; must be one of: agbya, taks, coptic, hymns",
                )
            })
    }
}

fn validate_agbya(data: &Fields) -> DomainResult<()> {
    let is_int = |v: &Value| v.as_i64().is_some() || v.as_u64().is_some();

    match data.get("ageLevel") {
        Some(Value::Array(levels)) if levels.iter().all(is_int) => {}
        _ => return Err(DomainError::validation("ageLevel must be an array of integers")),
    }
    for field in ["content", "description", "title"] {
        if !data.get(field).is_some_and(Value::is_string) {
            return Err(DomainError::validation(format!("{field} must be a string")));
        }
    }
    for field in ["term", "yearNumber"] {
        if !data.get(field).is_some_and(is_int) {
            return Err(DomainError::validation(format!("{field} must be an integer")));
        }
    }
    Ok(())
}

/// A stored document: its id plus its fields.
///
/// Serialises flat (`{ "id": ..., ...fields }`), the shape the editors expect.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: Fields,
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = self.data.iter().filter(|(k, _)| k.as_str() != "id");
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", self.id.as_str())?;
        for (k, v) in extra {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
