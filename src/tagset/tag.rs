//! Tag (the type, or "code", carried by an annotation).

use std::collections::HashMap;

use uuid::Uuid;

use crate::support::{encode_color, timestamp};
use crate::tagset::Property;

/// Reserved property name carrying a tag's display colour as a decimal
/// string.
pub const PROP_DISPLAY_COLOR: &str = "catma_displaycolor";
/// Reserved property name carrying the author who created the markup.
pub const PROP_MARKUP_AUTHOR: &str = "catma_markupauthor";

/// A CATMA Tag: the type or "code" of an [`Annotation`](crate::Annotation).
///
/// `parent` is a back-reference, not ownership: it stores the parent tag's
/// UUID, resolved against the owning [`Tagset`](crate::Tagset)'s tag map
/// rather than held as a direct reference, so tags stay simple, acyclic-by-
/// construction values.
#[derive(Debug, Clone)]
pub struct Tag {
    pub uuid: Uuid,
    pub name: String,
    pub version: String,
    pub parent: Option<Uuid>,
    pub color: i64,
    pub properties: HashMap<String, Property>,
}

impl Tag {
    /// Creates a new root tag (no parent) with a random colour and the two
    /// reserved properties pre-populated.
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self::with_uuid(Uuid::new_v4(), name, None, author, None)
    }

    /// Creates a tag with explicit identity, as read back from a stand-off
    /// file.
    pub fn with_uuid(
        uuid: Uuid,
        name: impl Into<String>,
        parent: Option<Uuid>,
        author: impl Into<String>,
        color: Option<i64>,
    ) -> Self {
        let name = name.into();
        let color = color.unwrap_or_else(random_color);

        let mut tag = Self {
            uuid,
            name,
            version: timestamp(),
            parent,
            color,
            properties: HashMap::new(),
        };

        tag.add_or_update_property(PROP_DISPLAY_COLOR, &color.to_string(), None, false);
        tag.add_or_update_property(PROP_MARKUP_AUTHOR, &author.into(), None, false);

        tag
    }

    /// Adds a property value, creating the property if it does not exist
    /// yet. When `adhoc` is `false` the value is also recorded as a proposed
    /// value on the tag (deduplicated); when `true` it is contributed by an
    /// annotation ad hoc and does not alter the tag's proposed-value list.
    pub fn add_or_update_property(
        &mut self,
        name: &str,
        value: &str,
        property_uuid: Option<Uuid>,
        adhoc: bool,
    ) {
        match self.properties.get_mut(name) {
            Some(prop) => {
                if !adhoc {
                    prop.add_value(value);
                }
            }
            None => {
                let mut values = Vec::new();
                if !adhoc {
                    values.push(value.to_owned());
                }
                let prop = match property_uuid {
                    Some(id) => Property::with_uuid(id, name, values),
                    None => Property::new(name, values),
                };
                self.properties.insert(name.to_owned(), prop);
            }
        }
    }

    /// Inserts an already-built property definition, replacing any existing
    /// property of the same name.
    pub fn add_property(&mut self, property: Property) {
        self.properties.insert(property.name.clone(), property);
    }

    /// The tag's hierarchy path within its tagset, e.g. `/root-name/tag-name`.
    /// `resolve_parent` looks up a tag by UUID within the owning tagset.
    pub fn path(&self, resolve_parent: &dyn Fn(Uuid) -> Option<Tag>) -> String {
        match self.parent.and_then(|id| resolve_parent(id)) {
            Some(parent) => format!("{}/{}", parent.path(resolve_parent), self.name),
            None => format!("/{}", self.name),
        }
    }
}

/// Default tag colour source. `uuid` is already a dependency, so a fresh
/// v4 UUID's first three bytes give three independent random channels
/// without requiring a `rand` dependency the rest of the crate has no other
/// use for.
fn random_color() -> i64 {
    let bytes = *Uuid::new_v4().as_bytes();
    encode_color(bytes[0], bytes[1], bytes[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tag_has_reserved_properties() {
        let tag = Tag::new("person", "jane");
        assert!(tag.properties.contains_key(PROP_DISPLAY_COLOR));
        assert!(tag.properties.contains_key(PROP_MARKUP_AUTHOR));
        assert_eq!(
            tag.properties[PROP_MARKUP_AUTHOR].values,
            vec!["jane".to_owned()]
        );
    }

    #[test]
    fn root_path_has_no_parent_segment() {
        let tag = Tag::new("person", "jane");
        assert_eq!(tag.path(&|_| None), "/person");
    }

    #[test]
    fn nested_path_prefixes_parent_name() {
        let parent = Tag::new("entity", "jane");
        let mut child = Tag::new("person", "jane");
        child.parent = Some(parent.uuid);

        let parent_clone = parent.clone();
        let path = child.path(&move |id| {
            if id == parent_clone.uuid {
                Some(parent_clone.clone())
            } else {
                None
            }
        });
        assert_eq!(path, "/entity/person");
    }

    #[test]
    fn adhoc_property_value_does_not_persist_on_tag() {
        let mut tag = Tag::new("person", "jane");
        tag.add_or_update_property("nationality", "french", None, true);
        assert!(tag.properties["nationality"].values.is_empty());
    }
}
