//! Keyword search, pagination and facet counts on top of the filter engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::FacetCatalog;
use crate::models::{FacetKind, FacetValue, JobRecord};
use crate::predicate::{self, Conjunct};
use crate::query;
use crate::state::FilterState;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub filters: FilterState,
    pub keywords: String,
    pub page: usize,
    pub page_size: usize,
}

impl SearchRequest {
    pub fn new(filters: FilterState) -> Self {
        Self {
            filters,
            keywords: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Decodes facets plus `q`, `page` and `pageSize`. Bad numbers fall back
    /// to their defaults.
    pub fn from_query_string(query_string: &str, catalog: &FacetCatalog) -> Self {
        let mut request = Self::new(query::decode(query_string, catalog));
        for (key, raw) in query::parse_pairs(query_string) {
            let value = query::decode_component(&raw).unwrap_or_default();
            match key.as_str() {
                "q" => request.keywords = value.trim().to_string(),
                "page" => request.page = value.trim().parse().unwrap_or(1),
                "pageSize" => request.page_size = value.trim().parse().unwrap_or(DEFAULT_PAGE_SIZE),
                _ => {}
            }
        }
        request
    }

    pub fn to_query_string(&self, catalog: &FacetCatalog) -> String {
        let mut parts = Vec::new();
        let facets = query::encode(catalog, &self.filters);
        if !facets.is_empty() {
            parts.push(facets);
        }
        let keywords = self.keywords.trim();
        if !keywords.is_empty() {
            parts.push(format!("q={}", query::encode_component(keywords)));
        }
        if self.effective_page() > 1 {
            parts.push(format!("page={}", self.effective_page()));
        }
        if self.effective_page_size() != DEFAULT_PAGE_SIZE {
            parts.push(format!("pageSize={}", self.effective_page_size()));
        }
        parts.join("&")
    }

    pub fn effective_page(&self) -> usize {
        self.page.max(1)
    }

    pub fn effective_page_size(&self) -> usize {
        if (1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            self.page_size
        } else {
            DEFAULT_PAGE_SIZE
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub jobs: Vec<JobRecord>,
    pub total_count: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

pub fn search(catalog: &FacetCatalog, jobs: &[JobRecord], request: &SearchRequest) -> SearchPage {
    search_at(catalog, jobs, request, Utc::now())
}

pub fn search_at(
    catalog: &FacetCatalog,
    jobs: &[JobRecord],
    request: &SearchRequest,
    now: DateTime<Utc>,
) -> SearchPage {
    let predicate = predicate::compile_at(catalog, &request.filters, now);
    let needle = request.keywords.trim().to_lowercase();

    let matched: Vec<&JobRecord> = jobs
        .iter()
        .filter(|job| predicate.matches(job))
        .filter(|job| needle.is_empty() || matches_keywords(job, &needle))
        .collect();

    let page_size = request.effective_page_size();
    let current_page = request.effective_page();
    let total_count = matched.len();
    let total_pages = total_count.div_ceil(page_size);

    let jobs = matched
        .into_iter()
        .skip((current_page - 1).saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect();

    SearchPage {
        jobs,
        total_count,
        current_page,
        page_size,
        total_pages,
    }
}

/// `needle` must already be lowercase.
fn matches_keywords(job: &JobRecord, needle: &str) -> bool {
    [Some(job.title.as_str()), job.company.as_deref(), job.description.as_deref()]
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(needle))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateCount {
    pub value: FacetValue,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetCounts {
    pub key: String,
    pub label: String,
    pub kind: FacetKind,
    /// Per candidate; empty for boolean facets.
    pub candidates: Vec<CandidateCount>,
    /// Boolean facets: records where the flag is set.
    pub flagged: Option<usize>,
}

/// How many records each candidate would match on its own.
pub fn facet_counts(catalog: &FacetCatalog, jobs: &[JobRecord], now: DateTime<Utc>) -> Vec<FacetCounts> {
    catalog
        .iter()
        .map(|facet| {
            if facet.kind == FacetKind::Boolean {
                let flagged = jobs
                    .iter()
                    .filter(|job| job.flag(facet.field) == Some(true))
                    .count();
                return FacetCounts {
                    key: facet.key.clone(),
                    label: facet.label.clone(),
                    kind: facet.kind,
                    candidates: Vec::new(),
                    flagged: Some(flagged),
                };
            }

            let candidates = facet
                .candidates
                .iter()
                .map(|candidate| {
                    // No conjunct means the candidate constrains nothing.
                    let count = Conjunct::for_candidate(facet, candidate, now)
                        .map_or(jobs.len(), |c| jobs.iter().filter(|job| c.matches(job)).count());
                    CandidateCount {
                        value: candidate.clone(),
                        count,
                    }
                })
                .collect();

            FacetCounts {
                key: facet.key.clone(),
                label: facet.label.clone(),
                kind: facet.kind,
                candidates,
                flagged: None,
            }
        })
        .collect()
}
