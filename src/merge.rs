//! Stand-off merger (C2): partitions a flat text of length `L` into maximal
//! non-overlapping sub-ranges, each carrying the set of annotations that
//! cover it.

use std::collections::BTreeMap;

use crate::range::Range;
use crate::Annotation;

/// Merges every range of every annotation into a partition of `[0, L)`.
///
/// The returned map's keys partition `[0, L)` exactly; every key lists
/// exactly the annotations (in processing order) whose ranges cover it.
/// Processing order does not affect the resulting set of `(range, annotations)`
/// pairs (P-M1), only the order within `BTreeMap` iteration, which is always
/// sorted by range.
pub fn merge_ranges<'a>(
    length: usize,
    annotations: impl IntoIterator<Item = &'a Annotation>,
) -> BTreeMap<Range, Vec<&'a Annotation>> {
    let mut merged: BTreeMap<Range, Vec<&'a Annotation>> = BTreeMap::new();
    merged.insert(Range::new(0, length), Vec::new());

    for annotation in annotations {
        for target in annotation.merged_ranges() {
            apply_range(&mut merged, target, annotation);
        }
    }

    merged
}

/// Folds a single `(annotation, range)` pair into the partition map: finds
/// every key overlapping `target`, and for each either appends the
/// annotation (if the key is fully contained in `target`) or splits the key
/// into its disjoint remainder(s) plus the overlap.
fn apply_range<'a>(
    merged: &mut BTreeMap<Range, Vec<&'a Annotation>>,
    target: Range,
    annotation: &'a Annotation,
) {
    let affected: Vec<Range> = merged
        .keys()
        .filter(|key| key.overlap(&target).is_some())
        .copied()
        .collect();

    for key in affected {
        if target.contains(&key) {
            merged.get_mut(&key).expect("key just collected from map").push(annotation);
            continue;
        }

        let existing = merged.remove(&key).expect("key just collected from map");
        let overlap = key
            .overlap(&target)
            .expect("key was filtered for overlap with target");
        let remainders = key.disjoint_remainder(&target);

        for remainder in remainders {
            merged.insert(remainder, existing.clone());
        }

        let mut covered = existing;
        covered.push(annotation);
        merged.insert(overlap, covered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagset::Tag;

    fn annotation(ranges: &[(usize, usize)]) -> Annotation {
        let mut anno = Annotation::new(Tag::new("tag", "jane"));
        anno.ranges = ranges.iter().map(|&(s, e)| Range::new(s, e)).collect();
        anno
    }

    fn keys_and_counts(map: &BTreeMap<Range, Vec<&Annotation>>) -> Vec<(Range, usize)> {
        map.iter().map(|(r, v)| (*r, v.len())).collect()
    }

    #[test]
    fn scenario_1_single_text_overlap() {
        let a = annotation(&[(2, 5)]);
        let b = annotation(&[(4, 8)]);
        let merged = merge_ranges(10, [&a, &b]);

        assert_eq!(
            keys_and_counts(&merged),
            vec![
                (Range::new(0, 2), 0),
                (Range::new(2, 4), 1),
                (Range::new(4, 5), 2),
                (Range::new(5, 8), 1),
                (Range::new(8, 10), 0),
            ]
        );
        assert!(merged[&Range::new(2, 4)].iter().any(|x| x.uuid == a.uuid));
        assert!(merged[&Range::new(4, 5)].iter().any(|x| x.uuid == a.uuid));
        assert!(merged[&Range::new(4, 5)].iter().any(|x| x.uuid == b.uuid));
        assert!(merged[&Range::new(5, 8)].iter().any(|x| x.uuid == b.uuid));
    }

    #[test]
    fn scenario_2_contained() {
        let a = annotation(&[(2, 8)]);
        let b = annotation(&[(4, 6)]);
        let merged = merge_ranges(10, [&a, &b]);

        assert_eq!(
            keys_and_counts(&merged),
            vec![
                (Range::new(0, 2), 0),
                (Range::new(2, 4), 1),
                (Range::new(4, 6), 2),
                (Range::new(6, 8), 1),
                (Range::new(8, 10), 0),
            ]
        );
    }

    #[test]
    fn scenario_3_multiple_noncontiguous_ranges() {
        let a = annotation(&[(0, 3), (6, 10)]);
        let merged = merge_ranges(10, [&a]);

        assert_eq!(
            keys_and_counts(&merged),
            vec![
                (Range::new(0, 3), 1),
                (Range::new(3, 6), 0),
                (Range::new(6, 10), 1),
            ]
        );
    }

    #[test]
    fn merger_output_partitions_full_length() {
        let a = annotation(&[(2, 5)]);
        let b = annotation(&[(4, 8)]);
        let merged = merge_ranges(10, [&a, &b]);

        let mut cursor = 0;
        for key in merged.keys() {
            assert_eq!(key.start, cursor);
            cursor = key.end;
        }
        assert_eq!(cursor, 10);
    }

    #[test]
    fn stability_adding_annotation_matching_existing_boundaries_only_appends() {
        let a = annotation(&[(2, 5)]);
        let mut merged = merge_ranges(10, [&a]);
        let before_keys: Vec<Range> = merged.keys().copied().collect();

        let b = annotation(&[(2, 5)]);
        apply_range(&mut merged, Range::new(2, 5), &b);

        let after_keys: Vec<Range> = merged.keys().copied().collect();
        assert_eq!(before_keys, after_keys);
        assert_eq!(merged[&Range::new(2, 5)].len(), 2);
    }
}
