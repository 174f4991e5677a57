//! Annotation: a tagged assertion about one or more character ranges.

use std::collections::HashMap;

use uuid::Uuid;

use crate::range::Range;
use crate::tagset::Tag;

/// A CATMA Annotation, typed by a [`Tag`]. Carries a (possibly
/// non-contiguous) set of character ranges and a `property name -> values`
/// map.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub uuid: Uuid,
    pub tag: Tag,
    pub ranges: Vec<Range>,
    pub properties: HashMap<String, Vec<String>>,
}

impl Annotation {
    /// Creates a new, empty annotation for `tag`.
    pub fn new(tag: Tag) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            tag,
            ranges: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Creates an annotation with explicit identity, as read back from a
    /// stand-off file.
    pub fn with_uuid(uuid: Uuid, tag: Tag) -> Self {
        Self {
            uuid,
            tag,
            ranges: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Adds a property value. Deduplicated, insertion order irrelevant,
    /// matching the source's set-of-strings semantics. When `adhoc` is
    /// `false` the value is also proposed on the tag.
    pub fn add_property(&mut self, name: &str, value: &str, adhoc: bool) {
        let values = self.properties.entry(name.to_owned()).or_default();
        if !values.iter().any(|v| v == value) {
            values.push(value.to_owned());
        }
        self.tag.add_or_update_property(name, value, None, adhoc);
    }

    /// The annotation's ranges, sorted and with adjacent ranges merged —
    /// this is the set the projector walks to build overlays, and the set
    /// the stand-off writer uses for the merge-ranges map.
    pub fn merged_ranges(&self) -> Vec<Range> {
        let mut sorted = self.ranges.clone();
        sorted.sort();
        Range::merge_adjacent(&sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_ranges_coalesces_adjacent_input_ranges() {
        let mut anno = Annotation::new(Tag::new("person", "jane"));
        anno.ranges = vec![Range::new(5, 8), Range::new(0, 5), Range::new(10, 12)];

        assert_eq!(
            anno.merged_ranges(),
            vec![Range::new(0, 8), Range::new(10, 12)]
        );
    }

    #[test]
    fn adding_property_value_twice_does_not_duplicate() {
        let mut anno = Annotation::new(Tag::new("person", "jane"));
        anno.add_property("nationality", "french", true);
        anno.add_property("nationality", "french", true);
        assert_eq!(anno.properties["nationality"], vec!["french".to_owned()]);
    }

    #[test]
    fn non_adhoc_property_value_is_proposed_on_tag() {
        let mut anno = Annotation::new(Tag::new("person", "jane"));
        anno.add_property("nationality", "french", false);
        assert_eq!(
            anno.tag.properties["nationality"].values,
            vec!["french".to_owned()]
        );
    }
}
