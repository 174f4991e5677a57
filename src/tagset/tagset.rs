//! Tagset: a named, versioned container of [`Tag`]s.

use std::collections::HashMap;

use uuid::Uuid;

use crate::support::timestamp;
use crate::tagset::Tag;

/// A CATMA Tagset: a container of [`Tag`]s forming a forest (each tag has at
/// most one parent, resolved within this tagset).
#[derive(Debug, Clone)]
pub struct Tagset {
    pub uuid: Uuid,
    pub name: String,
    pub version: String,
    pub tags: HashMap<Uuid, Tag>,
}

impl Tagset {
    /// Creates a new, empty tagset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            version: timestamp(),
            tags: HashMap::new(),
        }
    }

    /// Creates a tagset with explicit identity and version, as read back
    /// from a stand-off file.
    pub fn with_uuid(uuid: Uuid, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            version: version.into(),
            tags: HashMap::new(),
        }
    }

    /// Adds (or replaces) a tag.
    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.insert(tag.uuid, tag);
    }

    /// Looks up a tag by its hierarchy path, e.g. `/root-name/tag-name`.
    pub fn tag_by_path(&self, path: &str) -> Option<&Tag> {
        self.tags
            .values()
            .find(|tag| self.path_of(tag) == path)
    }

    /// Resolves a tag's hierarchy path within this tagset.
    pub fn path_of(&self, tag: &Tag) -> String {
        tag.path(&|id| self.tags.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lookup_by_path_resolves_nested_hierarchy() {
        let mut tagset = Tagset::new("default");
        let mut root = Tag::new("entity", "jane");
        root.parent = None;
        let root_uuid = root.uuid;
        tagset.add_tag(root);

        let mut child = Tag::new("person", "jane");
        child.parent = Some(root_uuid);
        let child_uuid = child.uuid;
        tagset.add_tag(child);

        let found = tagset.tag_by_path("/entity/person").unwrap();
        assert_eq!(found.uuid, child_uuid);
    }
}
