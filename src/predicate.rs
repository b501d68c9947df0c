//! Compiles filter state into a predicate over job records.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::catalog::FacetCatalog;
use crate::models::{FacetDefinition, FacetKind, FacetValue, JobField, JobRecord};
use crate::state::{FacetSelection, FilterState};

/// One condition ANDed into a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Conjunct {
    /// The field holds at least one of `accepted`.
    AnyOf { field: JobField, accepted: Vec<String> },
    RequireTrue(JobField),
    PostedSince(DateTime<Utc>),
}

impl Conjunct {
    pub fn matches(&self, job: &JobRecord) -> bool {
        match self {
            Conjunct::AnyOf { field, accepted } => job
                .text_values(*field)
                .into_iter()
                .any(|value| accepted.iter().any(|a| a == value)),
            Conjunct::RequireTrue(field) => job.flag(*field) == Some(true),
            Conjunct::PostedSince(since) => job.posted_at >= *since,
        }
    }

    /// The constraint an active selection puts on records; `None` for a
    /// default selection.
    pub(crate) fn for_selection(
        facet: &FacetDefinition,
        selection: &FacetSelection,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if selection.is_default() {
            return None;
        }
        match selection {
            FacetSelection::Toggle(_) => {
                if facet.field.is_flag() {
                    Some(Conjunct::RequireTrue(facet.field))
                } else {
                    warn!(facet = %facet.key, "boolean facet bound to a non-flag field, ignoring");
                    None
                }
            }
            FacetSelection::Single(id) => Self::for_ids(facet, id.iter().cloned().collect(), now),
            FacetSelection::Multi(ids) => Self::for_ids(facet, ids.clone(), now),
            FacetSelection::FreeText(values) => Some(Conjunct::AnyOf {
                field: facet.field,
                accepted: values.iter().map(|v| v.title.clone()).collect(),
            }),
        }
    }

    /// The constraint selecting only `candidate` would produce.
    pub(crate) fn for_candidate(
        facet: &FacetDefinition,
        candidate: &FacetValue,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        match facet.kind {
            FacetKind::FreeTextAutocomplete => Some(Conjunct::AnyOf {
                field: facet.field,
                accepted: vec![candidate.title.clone()],
            }),
            FacetKind::Boolean => None,
            _ => Self::for_ids(facet, vec![candidate.id.clone()], now),
        }
    }

    fn for_ids(facet: &FacetDefinition, ids: Vec<String>, now: DateTime<Utc>) -> Option<Self> {
        if facet.field != JobField::PostedAt {
            return Some(Conjunct::AnyOf {
                field: facet.field,
                accepted: ids,
            });
        }

        // Several windows selected: the widest one wins.
        let days = ids.iter().filter_map(|id| id.parse::<i64>().ok()).max();
        match days {
            // A window reaching past the calendar's start bounds nothing.
            Some(days) => Duration::try_days(days)
                .and_then(|window| now.checked_sub_signed(window))
                .map(Conjunct::PostedSince),
            None => {
                warn!(facet = %facet.key, ?ids, "posted window is not a day count, ignoring");
                None
            }
        }
    }
}

/// AND of every active facet's conjunct. An empty predicate accepts all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPredicate {
    conjuncts: Vec<Conjunct>,
}

impl JobPredicate {
    pub fn matches(&self, job: &JobRecord) -> bool {
        self.conjuncts.iter().all(|c| c.matches(job))
    }

    pub fn filter<'a>(&self, jobs: &'a [JobRecord]) -> Vec<&'a JobRecord> {
        jobs.iter().filter(|job| self.matches(job)).collect()
    }

    pub fn count(&self, jobs: &[JobRecord]) -> usize {
        jobs.iter().filter(|job| self.matches(job)).count()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.conjuncts.is_empty()
    }

    pub fn conjuncts(&self) -> &[Conjunct] {
        &self.conjuncts
    }

    pub fn into_fn(self) -> impl Fn(&JobRecord) -> bool {
        move |job| self.matches(job)
    }
}

pub fn compile(catalog: &FacetCatalog, state: &FilterState) -> JobPredicate {
    compile_at(catalog, state, Utc::now())
}

/// Like [`compile`], with posted-duration windows measured back from `now`.
pub fn compile_at(catalog: &FacetCatalog, state: &FilterState, now: DateTime<Utc>) -> JobPredicate {
    let conjuncts = catalog
        .iter()
        .filter_map(|facet| {
            let selection = state.get(&facet.key)?;
            Conjunct::for_selection(facet, selection, now)
        })
        .collect();
    JobPredicate { conjuncts }
}
