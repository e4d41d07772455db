use std::collections::HashMap;

use kbase_core::types::{MergedHit, SearchHit};

/// Collapse per-axis hits into one ranked list with one entry per document.
///
/// The closest hit wins a document; on equal distance the axis listed first
/// keeps it. Output is ascending by distance (ties by `document_id`) and at
/// most `max_total` long.
pub fn merge<A, H>(axis_results: &[(A, H)], max_total: usize) -> Vec<MergedHit>
where
    A: AsRef<str>,
    H: AsRef<[SearchHit]>,
{
    let mut by_doc: HashMap<&str, (&str, &SearchHit)> = HashMap::new();
    for (axis, hits) in axis_results {
        let axis = axis.as_ref();
        for hit in hits.as_ref() {
            by_doc
                .entry(hit.document_id.as_str())
                .and_modify(|best| {
                    if hit.distance < best.1.distance {
                        *best = (axis, hit);
                    }
                })
                .or_insert((axis, hit));
        }
    }
    let mut merged: Vec<MergedHit> = by_doc
        .into_values()
        .map(|(axis, hit)| MergedHit::from_hit(hit.clone(), axis))
        .collect();
    merged.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.document_id.cmp(&b.document_id)));
    merged.truncate(max_total);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(doc: &str, distance: f32, collection: &str) -> SearchHit {
        SearchHit {
            record_id: format!("{doc}_{collection}_0"),
            document_id: doc.to_string(),
            distance,
            collection: collection.to_string(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn one_entry_per_document_with_the_smaller_distance() {
        let results = vec![
            ("content", vec![hit("A", 0.40, "core"), hit("B", 0.10, "core")]),
            ("topic", vec![hit("A", 0.25, "main"), hit("B", 0.30, "main")]),
        ];
        let merged = merge(&results, 10);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].document_id.as_str(), merged[0].axis.as_str(), merged[0].distance), ("B", "content", 0.10));
        assert_eq!((merged[1].document_id.as_str(), merged[1].axis.as_str(), merged[1].distance), ("A", "topic", 0.25));
        assert_eq!(merged[1].collection, "main");
    }

    #[test]
    fn duplicates_within_one_axis_collapse_too() {
        let results = vec![("content", vec![hit("A", 0.5, "core"), hit("A", 0.2, "core")])];
        let merged = merge(&results, 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].distance, 0.2);
    }

    #[test]
    fn equal_distance_keeps_first_axis_and_ties_sort_by_document() {
        let results = vec![
            ("content", vec![hit("B", 0.2, "core"), hit("A", 0.2, "core")]),
            ("topic", vec![hit("B", 0.2, "main")]),
        ];
        let merged = merge(&results, 10);
        let order: Vec<&str> = merged.iter().map(|m| m.document_id.as_str()).collect();
        assert_eq!(order, vec!["A", "B"]);
        assert_eq!(merged[1].axis, "content");
    }

    #[test]
    fn truncation_keeps_the_smallest_distances() {
        let results = vec![
            ("content", vec![hit("A", 0.12, "core"), hit("B", 0.41, "core")]),
            ("topic", vec![hit("C", 0.20, "sub")]),
        ];
        let merged = merge(&results, 2);
        let order: Vec<(&str, f32)> = merged.iter().map(|m| (m.document_id.as_str(), m.distance)).collect();
        assert_eq!(order, vec![("A", 0.12), ("C", 0.20)]);
        assert!(merge(&results, 0).is_empty());
    }

    #[test]
    fn output_is_non_decreasing() {
        let results = vec![
            ("a", (0..20).map(|i| hit(&format!("d{i}"), ((i * 7) % 11) as f32 / 10.0, "x")).collect::<Vec<_>>()),
            ("b", (0..20).map(|i| hit(&format!("d{}", i + 5), ((i * 3) % 13) as f32 / 10.0, "y")).collect::<Vec<_>>()),
        ];
        let merged = merge(&results, 15);
        assert_eq!(merged.len(), 15);
        assert!(merged.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn empty_input_is_empty_output() {
        let results: Vec<(&str, Vec<SearchHit>)> = Vec::new();
        assert!(merge(&results, 10).is_empty());
        assert!(merge(&[("content", Vec::<SearchHit>::new())], 10).is_empty());
    }
}
