use proptest::prelude::*;

use jobsieve::matcher::matches_needle;
use jobsieve::{FacetCatalog, FacetValue, match_candidates};

fn skills() -> Vec<FacetValue> {
    FacetCatalog::job_board()
        .get("skills")
        .map(|facet| facet.candidates.clone())
        .unwrap_or_default()
}

fn arb_candidates() -> impl Strategy<Value = Vec<FacetValue>> {
    prop::collection::vec(("[a-z]{1,8}", "[A-Za-z .]{1,12}", proptest::option::of("[A-Za-z ]{1,12}")), 0..20)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (id, title, subtitle))| {
                    let value = FacetValue::new(format!("{id}-{i}"), title);
                    match subtitle {
                        Some(subtitle) => value.with_subtitle(subtitle),
                        None => value,
                    }
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn test_match_never_exceeds_limit(query in ".{0,6}", candidates in arb_candidates(), limit in 0usize..12) {
        let result = match_candidates(&query, &candidates, limit);
        prop_assert!(result.len() <= limit);
        prop_assert!(result.len() <= candidates.len());
    }

    #[test]
    fn test_every_match_contains_the_query(query in "[a-zA-Z ]{1,4}", candidates in arb_candidates()) {
        let needle = query.trim().to_lowercase();
        for value in match_candidates(&query, &candidates, usize::MAX) {
            prop_assert!(needle.is_empty() || matches_needle(&value, &needle));
        }
    }

    #[test]
    fn test_matches_keep_catalog_order(query in "[a-z]{0,2}", candidates in arb_candidates()) {
        let result = match_candidates(&query, &candidates, usize::MAX);
        let positions: Vec<usize> = result
            .iter()
            .filter_map(|value| candidates.iter().position(|c| c.id == value.id))
            .collect();
        prop_assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_longer_query_narrows(prefix in "[a-z]{0,3}", extra in "[a-z]{1,2}") {
        let candidates = skills();
        let wide = match_candidates(&prefix, &candidates, usize::MAX);
        let narrow = match_candidates(&format!("{prefix}{extra}"), &candidates, usize::MAX);
        prop_assert!(narrow.len() <= wide.len());
        for value in &narrow {
            prop_assert!(wide.contains(value));
        }
    }

    #[test]
    fn test_blank_query_browses(spaces in " {0,4}", limit in 0usize..12) {
        let candidates = skills();
        let result = match_candidates(&spaces, &candidates, limit);
        prop_assert_eq!(result.as_slice(), &candidates[..limit.min(candidates.len())]);
    }
}
