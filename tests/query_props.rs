use std::sync::Arc;

use proptest::prelude::*;

use jobsieve::query::{decode, encode};
use jobsieve::{FacetCatalog, FacetKind, FacetValue, FilterStore, SearchRequest};

/// One store operation, addressed by indices into the catalog.
#[derive(Debug, Clone)]
enum Op {
    Pick { facet: usize, candidate: usize, on: bool },
    /// A free-text pick rebuilt from id and lowercased title alone.
    Bare { facet: usize, candidate: usize },
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        8 => (0usize..16, 0usize..16, any::<bool>())
            .prop_map(|(facet, candidate, on)| Op::Pick { facet, candidate, on }),
        3 => (0usize..16, 0usize..16).prop_map(|(facet, candidate)| Op::Bare { facet, candidate }),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..24)
}

fn build_store(ops: &[Op]) -> FilterStore {
    let catalog = Arc::new(FacetCatalog::job_board());
    let facets: Vec<_> = catalog.iter().collect();
    let mut store = FilterStore::new(Arc::clone(&catalog));
    for op in ops {
        match *op {
            Op::Clear => store.clear_all(),
            Op::Bare { facet, candidate } => {
                let free_text: Vec<_> = facets
                    .iter()
                    .filter(|f| f.kind == FacetKind::FreeTextAutocomplete)
                    .collect();
                let facet = free_text[facet % free_text.len()];
                let value = &facet.candidates[candidate % facet.candidates.len()];
                let bare = FacetValue::new(value.id.clone(), value.title.to_lowercase());
                let result = store.add_free_text_selection(&facet.key, bare);
                assert!(result.is_ok(), "catalog pick rejected: {:?}", result);
            }
            Op::Pick { facet, candidate, on } => {
                let facet = facets[facet % facets.len()];
                let value = facet
                    .candidates
                    .get(candidate % facet.candidates.len().max(1))
                    .cloned();
                let result = match (facet.kind, value) {
                    (FacetKind::Boolean, _) => store.set_boolean(&facet.key, on),
                    (FacetKind::SingleSelect, Some(value)) => {
                        store.set_single_select(&facet.key, on.then_some(value.id.as_str()))
                    }
                    (FacetKind::MultiSelect, Some(value)) => {
                        store.toggle_multi_select(&facet.key, &value.id, on)
                    }
                    (FacetKind::FreeTextAutocomplete, Some(value)) if on => {
                        store.add_free_text_selection(&facet.key, value)
                    }
                    (FacetKind::FreeTextAutocomplete, Some(value)) => {
                        store.remove_free_text_selection(&facet.key, &value.id)
                    }
                    (_, None) => Ok(()),
                };
                assert!(result.is_ok(), "catalog pick rejected: {:?}", result);
            }
        }
    }
    store
}

proptest! {
    #[test]
    fn test_encode_decode_round_trip(ops in arb_ops()) {
        let store = build_store(&ops);
        let encoded = encode(store.catalog(), store.state());
        prop_assert_eq!(&decode(&encoded, store.catalog()), store.state());
    }

    #[test]
    fn test_encoding_is_stable(ops in arb_ops()) {
        let store = build_store(&ops);
        let encoded = encode(store.catalog(), store.state());
        let again = encode(store.catalog(), &decode(&encoded, store.catalog()));
        prop_assert_eq!(encoded, again);
    }

    #[test]
    fn test_empty_state_encodes_empty(ops in arb_ops()) {
        let mut store = build_store(&ops);
        store.clear_all();
        prop_assert_eq!(encode(store.catalog(), store.state()), "");
        prop_assert!(!store.has_active_filters());
    }

    #[test]
    fn test_decode_never_panics(input in ".*") {
        let catalog = FacetCatalog::job_board();
        let state = decode(&input, &catalog);
        prop_assert_eq!(state.len(), catalog.len());
    }

    #[test]
    fn test_decode_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
        let catalog = FacetCatalog::job_board();
        let input = String::from_utf8_lossy(&bytes);
        let _ = decode(&input, &catalog);
        let _ = SearchRequest::from_query_string(&input, &catalog);
    }

    #[test]
    fn test_decoded_state_is_replaceable(input in "[a-zA-Z=&,%0-9_]{0,60}") {
        let catalog = Arc::new(FacetCatalog::job_board());
        let mut store = FilterStore::new(Arc::clone(&catalog));
        let state = decode(&input, &catalog);
        prop_assert!(store.replace_state(state.clone()).is_ok());
        prop_assert_eq!(store.state(), &state);
    }
}
