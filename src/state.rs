//! Filter state and the store that owns it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::FacetCatalog;
use crate::error::FilterError;
use crate::matcher::{MatchResult, match_candidates};
use crate::models::{FacetDefinition, FacetKind, FacetValue};
use crate::predicate::{self, JobPredicate};

/// The current value of one facet, shaped by the facet's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetSelection {
    Single(Option<String>),
    /// Selected ids in insertion order, no duplicates.
    Multi(Vec<String>),
    Toggle(bool),
    /// Accumulated picks in insertion order, unique by id.
    FreeText(Vec<FacetValue>),
}

impl FacetSelection {
    pub fn default_for(kind: FacetKind) -> Self {
        match kind {
            FacetKind::SingleSelect => FacetSelection::Single(None),
            FacetKind::MultiSelect => FacetSelection::Multi(Vec::new()),
            FacetKind::Boolean => FacetSelection::Toggle(false),
            FacetKind::FreeTextAutocomplete => FacetSelection::FreeText(Vec::new()),
        }
    }

    pub fn kind(&self) -> FacetKind {
        match self {
            FacetSelection::Single(_) => FacetKind::SingleSelect,
            FacetSelection::Multi(_) => FacetKind::MultiSelect,
            FacetSelection::Toggle(_) => FacetKind::Boolean,
            FacetSelection::FreeText(_) => FacetKind::FreeTextAutocomplete,
        }
    }

    pub fn is_default(&self) -> bool {
        match self {
            FacetSelection::Single(id) => id.is_none(),
            FacetSelection::Multi(ids) => ids.is_empty(),
            FacetSelection::Toggle(on) => !on,
            FacetSelection::FreeText(values) => values.is_empty(),
        }
    }
}

/// One entry per catalog facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    entries: BTreeMap<String, FacetSelection>,
}

impl FilterState {
    /// All-default state for every facet in `catalog`.
    pub fn new(catalog: &FacetCatalog) -> Self {
        let entries = catalog
            .iter()
            .map(|facet| (facet.key.clone(), FacetSelection::default_for(facet.kind)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&FacetSelection> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FacetSelection)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True iff some facet differs from its kind's default.
    pub fn has_active_filters(&self) -> bool {
        self.entries.values().any(|s| !s.is_default())
    }

    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|s| !s.is_default()).count()
    }

    pub(crate) fn set(&mut self, key: &str, selection: FacetSelection) {
        self.entries.insert(key.to_string(), selection);
    }

    /// The slot for `key`, reset to `kind`'s default if it holds anything else.
    fn slot(&mut self, key: &str, kind: FacetKind) -> &mut FacetSelection {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| FacetSelection::default_for(kind));
        if entry.kind() != kind {
            *entry = FacetSelection::default_for(kind);
        }
        entry
    }

    fn reset(&mut self) {
        for selection in self.entries.values_mut() {
            *selection = FacetSelection::default_for(selection.kind());
        }
    }
}

pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(&FilterState)>;

/// Owns the filter state of one search session. Every successful mutation
/// notifies each subscriber exactly once; a failed one changes nothing.
pub struct FilterStore {
    catalog: Arc<FacetCatalog>,
    state: FilterState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl FilterStore {
    pub fn new(catalog: Arc<FacetCatalog>) -> Self {
        let state = FilterState::new(&catalog);
        Self {
            catalog,
            state,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn catalog(&self) -> &FacetCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn has_active_filters(&self) -> bool {
        self.state.has_active_filters()
    }

    pub fn predicate(&self) -> JobPredicate {
        predicate::compile(&self.catalog, &self.state)
    }

    /// Autocomplete over a facet's candidates, bounded by its suggestion limit.
    pub fn suggest(&self, key: &str, query: &str) -> Result<MatchResult, FilterError> {
        let facet = self
            .catalog
            .get(key)
            .ok_or_else(|| FilterError::UnknownFacetKey(key.to_string()))?;
        Ok(match_candidates(query, &facet.candidates, facet.suggestion_limit))
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&FilterState) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn set_single_select(&mut self, key: &str, value_id: Option<&str>) -> Result<(), FilterError> {
        let facet = expect_kind(&self.catalog, key, FacetKind::SingleSelect)?;
        if let Some(id) = value_id {
            check_candidate(facet, id)?;
        }

        if let FacetSelection::Single(current) = self.state.slot(key, FacetKind::SingleSelect) {
            *current = value_id.map(str::to_string);
        }
        debug!(facet = key, value = ?value_id, "set single select");
        self.notify();
        Ok(())
    }

    pub fn toggle_multi_select(&mut self, key: &str, value_id: &str, included: bool) -> Result<(), FilterError> {
        let facet = expect_kind(&self.catalog, key, FacetKind::MultiSelect)?;
        check_candidate(facet, value_id)?;

        if let FacetSelection::Multi(ids) = self.state.slot(key, FacetKind::MultiSelect) {
            let present = ids.iter().any(|id| id == value_id);
            if included && !present {
                ids.push(value_id.to_string());
            } else if !included && present {
                ids.retain(|id| id != value_id);
            }
        }
        debug!(facet = key, value = value_id, included, "toggle multi select");
        self.notify();
        Ok(())
    }

    pub fn set_boolean(&mut self, key: &str, value: bool) -> Result<(), FilterError> {
        expect_kind(&self.catalog, key, FacetKind::Boolean)?;

        if let FacetSelection::Toggle(current) = self.state.slot(key, FacetKind::Boolean) {
            *current = value;
        }
        debug!(facet = key, value, "set boolean");
        self.notify();
        Ok(())
    }

    /// Adds a pick to a free-text facet. The pick resolves to the catalog's
    /// own value by id, else by title. Re-adding an id is a no-op; on a
    /// single-value facet the pick replaces the current one.
    pub fn add_free_text_selection(&mut self, key: &str, value: FacetValue) -> Result<(), FilterError> {
        let facet = expect_kind(&self.catalog, key, FacetKind::FreeTextAutocomplete)?;
        let single = facet.single_value;
        let value = resolve_free_text(facet, &value)?;

        if let FacetSelection::FreeText(values) = self.state.slot(key, FacetKind::FreeTextAutocomplete) {
            if single {
                values.clear();
                values.push(value.clone());
            } else if !values.iter().any(|v| v.id == value.id) {
                values.push(value.clone());
            }
        }
        debug!(facet = key, value = %value.title, "add free text selection");
        self.notify();
        Ok(())
    }

    pub fn remove_free_text_selection(&mut self, key: &str, value_id: &str) -> Result<(), FilterError> {
        expect_kind(&self.catalog, key, FacetKind::FreeTextAutocomplete)?;

        if let FacetSelection::FreeText(values) = self.state.slot(key, FacetKind::FreeTextAutocomplete) {
            values.retain(|v| v.id != value_id);
        }
        debug!(facet = key, value = value_id, "remove free text selection");
        self.notify();
        Ok(())
    }

    /// Replaces a free-text facet's picks with the catalog value titled
    /// `text`. Blank text clears.
    pub fn set_single_value(&mut self, key: &str, text: &str) -> Result<(), FilterError> {
        let facet = expect_kind(&self.catalog, key, FacetKind::FreeTextAutocomplete)?;
        let text = text.trim();
        let value = if text.is_empty() {
            None
        } else {
            let value = facet.candidate_by_title(text).ok_or_else(|| FilterError::UnknownCandidate {
                key: facet.key.clone(),
                id: text.to_string(),
            })?;
            Some(value.clone())
        };

        if let FacetSelection::FreeText(values) = self.state.slot(key, FacetKind::FreeTextAutocomplete) {
            values.clear();
            values.extend(value);
        }
        debug!(facet = key, text, "set single value");
        self.notify();
        Ok(())
    }

    /// Resets every facet in one step.
    pub fn clear_all(&mut self) {
        self.state.reset();
        debug!("cleared all filters");
        self.notify();
    }

    /// Swaps in a whole state, e.g. one decoded from a URL. Facets missing
    /// from `state` start at their default.
    pub fn replace_state(&mut self, state: FilterState) -> Result<(), FilterError> {
        let mut next = FilterState::new(&self.catalog);
        for (key, selection) in state.entries {
            let facet = self
                .catalog
                .get(&key)
                .ok_or_else(|| FilterError::UnknownFacetKey(key.clone()))?;
            if selection.kind() != facet.kind {
                return Err(FilterError::KindMismatch {
                    key,
                    expected: facet.kind,
                    actual: selection.kind(),
                });
            }
            next.entries.insert(key, selection);
        }

        self.state = next;
        debug!(active = self.state.active_count(), "replaced filter state");
        self.notify();
        Ok(())
    }

    fn notify(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}

fn expect_kind<'a>(
    catalog: &'a FacetCatalog,
    key: &str,
    expected: FacetKind,
) -> Result<&'a FacetDefinition, FilterError> {
    let facet = catalog
        .get(key)
        .ok_or_else(|| FilterError::UnknownFacetKey(key.to_string()))?;
    if facet.kind != expected {
        return Err(FilterError::KindMismatch {
            key: key.to_string(),
            expected,
            actual: facet.kind,
        });
    }
    Ok(facet)
}

fn check_candidate(facet: &FacetDefinition, id: &str) -> Result<(), FilterError> {
    if facet.candidate(id).is_none() {
        return Err(FilterError::UnknownCandidate {
            key: facet.key.clone(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Only catalog values are selectable, so every state survives the query
/// codec unchanged.
fn resolve_free_text(facet: &FacetDefinition, value: &FacetValue) -> Result<FacetValue, FilterError> {
    facet
        .candidate(&value.id)
        .or_else(|| facet.candidate_by_title(&value.title))
        .cloned()
        .ok_or_else(|| FilterError::UnknownCandidate {
            key: facet.key.clone(),
            id: value.id.clone(),
        })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn store() -> FilterStore {
        FilterStore::new(Arc::new(FacetCatalog::job_board()))
    }

    #[test]
    fn test_new_state_has_one_default_entry_per_facet() {
        let store = store();
        assert_eq!(store.state().len(), store.catalog().len());
        assert!(!store.has_active_filters());
        assert_eq!(store.state().get("isRemote"), Some(&FacetSelection::Toggle(false)));
        assert_eq!(store.state().get("jobType"), Some(&FacetSelection::Multi(vec![])));
    }

    #[test]
    fn test_toggle_multi_select_is_idempotent() {
        let mut store = store();
        store.toggle_multi_select("jobType", "full_time", true).unwrap();
        store.toggle_multi_select("jobType", "contract", true).unwrap();
        store.toggle_multi_select("jobType", "full_time", true).unwrap();
        assert_eq!(
            store.state().get("jobType"),
            Some(&FacetSelection::Multi(vec!["full_time".into(), "contract".into()]))
        );

        store.toggle_multi_select("jobType", "full_time", false).unwrap();
        store.toggle_multi_select("jobType", "full_time", false).unwrap();
        assert_eq!(
            store.state().get("jobType"),
            Some(&FacetSelection::Multi(vec!["contract".into()]))
        );
    }

    #[test]
    fn test_unknown_key_and_kind_mismatch() {
        let mut store = store();
        assert_eq!(
            store.set_boolean("salary", true),
            Err(FilterError::UnknownFacetKey("salary".into()))
        );
        assert_eq!(
            store.set_boolean("jobType", true),
            Err(FilterError::KindMismatch {
                key: "jobType".into(),
                expected: FacetKind::Boolean,
                actual: FacetKind::MultiSelect,
            })
        );
        assert!(matches!(
            store.set_single_select("isRemote", None),
            Err(FilterError::KindMismatch { .. })
        ));
        assert!(!store.has_active_filters());
    }

    #[test]
    fn test_unknown_candidate_rejected() {
        let mut store = store();
        assert!(matches!(
            store.toggle_multi_select("jobType", "gig", true),
            Err(FilterError::UnknownCandidate { .. })
        ));
        assert!(matches!(
            store.set_single_select("workMode", Some("moon")),
            Err(FilterError::UnknownCandidate { .. })
        ));
    }

    #[test]
    fn test_free_text_selection_is_a_set() {
        let mut store = store();
        let docker = FacetValue::new("docker", "Docker");
        store.add_free_text_selection("skills", docker.clone()).unwrap();
        store.add_free_text_selection("skills", docker.clone()).unwrap();
        store.add_free_text_selection("skills", FacetValue::new("aws", "AWS")).unwrap();
        match store.state().get("skills") {
            Some(FacetSelection::FreeText(values)) => {
                let titles: Vec<_> = values.iter().map(|v| v.title.as_str()).collect();
                assert_eq!(titles, vec!["Docker", "AWS"]);
            }
            other => panic!("unexpected selection: {other:?}"),
        }

        store.remove_free_text_selection("skills", "docker").unwrap();
        store.remove_free_text_selection("skills", "aws").unwrap();
        assert!(!store.has_active_filters());
    }

    #[test]
    fn test_single_value_facet_holds_one_pick() {
        let mut store = store();
        store.set_single_value("location", "london").unwrap();
        assert_eq!(
            store.state().get("location"),
            Some(&FacetSelection::FreeText(vec![
                FacetValue::new("london", "London").with_subtitle("United Kingdom")
            ]))
        );

        store.add_free_text_selection("location", FacetValue::new("berlin", "Berlin")).unwrap();
        match store.state().get("location") {
            Some(FacetSelection::FreeText(values)) => assert_eq!(values.len(), 1),
            other => panic!("unexpected selection: {other:?}"),
        }

        assert!(matches!(
            store.set_single_value("location", "Atlantis"),
            Err(FilterError::UnknownCandidate { .. })
        ));
        assert_eq!(
            store.state().get("location"),
            Some(&FacetSelection::FreeText(vec![
                FacetValue::new("berlin", "Berlin").with_subtitle("Germany")
            ]))
        );

        store.set_single_value("location", "  ").unwrap();
        assert!(!store.has_active_filters());
    }

    #[test]
    fn test_free_text_picks_resolve_to_catalog_values() {
        let mut store = store();
        store.add_free_text_selection("skills", FacetValue::new("docker", "docker")).unwrap();
        store.add_free_text_selection("skills", FacetValue::new("K8S", "kubernetes")).unwrap();
        assert_eq!(
            store.state().get("skills"),
            Some(&FacetSelection::FreeText(vec![
                FacetValue::new("docker", "Docker").with_subtitle("Containerization"),
                FacetValue::new("kubernetes", "Kubernetes").with_subtitle("Orchestration"),
            ]))
        );

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        store.subscribe(move |_| seen.set(seen.get() + 1));
        assert_eq!(
            store.add_free_text_selection("skills", FacetValue::new("terraform", "Terraform")),
            Err(FilterError::UnknownCandidate {
                key: "skills".into(),
                id: "terraform".into(),
            })
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_has_active_filters_tracks_every_kind() {
        let mut store = store();
        store.set_boolean("visaSponsorship", true).unwrap();
        assert!(store.has_active_filters());
        store.set_boolean("visaSponsorship", false).unwrap();
        assert!(!store.has_active_filters());

        store.set_single_select("workMode", Some("hybrid")).unwrap();
        assert!(store.has_active_filters());
        store.set_single_select("workMode", None).unwrap();
        assert!(!store.has_active_filters());
    }

    #[test]
    fn test_clear_all_notifies_once() {
        let mut store = store();
        store.set_boolean("isRemote", true).unwrap();
        store.toggle_multi_select("experienceLevel", "senior", true).unwrap();
        store.set_single_value("location", "Berlin").unwrap();

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        store.subscribe(move |state| {
            assert!(!state.has_active_filters());
            seen.set(seen.get() + 1);
        });

        store.clear_all();
        assert_eq!(calls.get(), 1);
        assert!(!store.has_active_filters());
    }

    #[test]
    fn test_notifications_per_mutation() {
        let mut store = store();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let id = store.subscribe(move |_| seen.set(seen.get() + 1));

        store.set_boolean("isRemote", true).unwrap();
        store.set_boolean("isRemote", true).unwrap();
        assert_eq!(calls.get(), 2);

        assert!(store.set_boolean("nope", true).is_err());
        assert_eq!(calls.get(), 2);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_boolean("isRemote", false).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_replace_state() {
        let mut source = store();
        source.toggle_multi_select("jobType", "contract", true).unwrap();
        let snapshot = source.state().clone();

        let mut target = store();
        target.replace_state(snapshot.clone()).unwrap();
        assert_eq!(target.state(), &snapshot);

        let mut foreign = snapshot.clone();
        foreign.set("salary", FacetSelection::Toggle(true));
        assert_eq!(
            target.replace_state(foreign),
            Err(FilterError::UnknownFacetKey("salary".into()))
        );

        let mut wrong_kind = snapshot;
        wrong_kind.set("isRemote", FacetSelection::Multi(vec![]));
        assert!(matches!(
            target.replace_state(wrong_kind),
            Err(FilterError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_suggest_uses_facet_limit() {
        let store = store();
        assert_eq!(store.suggest("skills", "").unwrap().len(), 8);
        assert_eq!(store.suggest("location", "").unwrap().len(), 6);
        let hits = store.suggest("location", "united").unwrap();
        assert_eq!(hits.len(), 3);
        assert!(store.suggest("salary", "x").is_err());
    }
}
