//! Stratified train/test partitioning by source set.

use crate::dataset::types::Segment;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Split segments into train/test, preserving each source set's proportion.
///
/// Each set contributes `round(test_size * n)` segments to the test side,
/// clamped so that any set with at least two segments appears on both sides.
/// Both partitions keep the input order. The same seed yields the same split.
pub fn stratified_split(
    segments: Vec<Segment>,
    test_size: f64,
    seed: u64,
) -> (Vec<Segment>, Vec<Segment>) {
    let mut by_set: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, segment) in segments.iter().enumerate() {
        by_set.entry(segment.set_name()).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut in_test = vec![false; segments.len()];

    for indices in by_set.values_mut() {
        let n = indices.len();
        let mut n_test = (test_size * n as f64).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = n_test.min(n);
        }

        indices.shuffle(&mut rng);
        for &i in indices.iter().take(n_test) {
            in_test[i] = true;
        }
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (segment, is_test) in segments.into_iter().zip(in_test) {
        if is_test {
            test.push(segment);
        } else {
            train.push(segment);
        }
    }

    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::types::Label;

    fn segments(set: &str, label: Label, count: usize) -> Vec<Segment> {
        (0..count)
            .map(|i| Segment::new(vec![i as f64], label, set, format!("{set}{i:03}")))
            .collect()
    }

    #[test]
    fn test_split_preserves_proportions() {
        let mut all = segments("F", Label::Normal, 10);
        all.extend(segments("S", Label::Seizure, 5));

        let (train, test) = stratified_split(all, 0.2, 2);
        assert_eq!(train.len() + test.len(), 15);
        assert_eq!(test.iter().filter(|s| s.set_name() == "F").count(), 2);
        assert_eq!(test.iter().filter(|s| s.set_name() == "S").count(), 1);
    }

    #[test]
    fn test_split_is_deterministic() {
        let all = segments("Z", Label::Normal, 20);
        let (_, a) = stratified_split(all.clone(), 0.25, 7);
        let (_, b) = stratified_split(all, 0.25, 7);
        let ids_a: Vec<&str> = a.iter().map(|s| s.segment_id()).collect();
        let ids_b: Vec<&str> = b.iter().map(|s| s.segment_id()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_small_sets_land_on_both_sides() {
        let all = segments("N", Label::Normal, 2);
        let (train, test) = stratified_split(all, 0.1, 0);
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 1);
    }
}
