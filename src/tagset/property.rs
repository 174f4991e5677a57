//! Tag property definitions.

use uuid::Uuid;

/// A named, multi-valued string attribute of a [`super::Tag`](crate::Tag).
///
/// Annotations contribute values to a tag's property; the list of values is
/// the *proposed* (not enforced) value set shown to an annotator, matching
/// CATMA's own loose typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub uuid: Uuid,
    pub name: String,
    pub values: Vec<String>,
}

impl Property {
    /// Creates a new property with a freshly generated UUID.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            values: values.into_iter().collect(),
        }
    }

    /// Creates a property with an explicit UUID, as read back from a
    /// stand-off file.
    pub fn with_uuid(uuid: Uuid, name: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            values: values.into_iter().collect(),
        }
    }

    /// Adds `value` to the proposed value list if not already present.
    pub fn add_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }
}
