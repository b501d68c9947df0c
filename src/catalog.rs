//! Facet catalog: the static definitions every filter session starts from.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::models::{FacetDefinition, FacetKind, FacetValue, JobField, fold_title};

/// Query parameters owned by the search request rather than by a facet.
pub const RESERVED_KEYS: [&str; 3] = ["q", "page", "pageSize"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetCatalog {
    facets: Vec<FacetDefinition>,
}

impl FacetCatalog {
    pub fn new(facets: Vec<FacetDefinition>) -> Result<Self, CatalogError> {
        let mut keys = HashSet::new();
        for facet in &facets {
            validate_facet(facet)?;
            if !keys.insert(facet.key.as_str()) {
                return Err(CatalogError::DuplicateKey(facet.key.clone()));
            }
        }
        Ok(Self { facets })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.facets)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn get(&self, key: &str) -> Option<&FacetDefinition> {
        self.facets.iter().find(|f| f.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FacetDefinition> {
        self.facets.iter()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// The job board's filter sidebar.
    pub fn job_board() -> Self {
        let work_modes = vec![
            FacetValue::new("remote", "Remote"),
            FacetValue::new("onsite", "Onsite"),
            FacetValue::new("hybrid", "Hybrid"),
        ];
        let job_types = vec![
            FacetValue::new("full_time", "Full Time"),
            FacetValue::new("part_time", "Part Time"),
            FacetValue::new("contract", "Contract"),
            FacetValue::new("freelance", "Freelance"),
            FacetValue::new("internship", "Internship"),
            FacetValue::new("temporary", "Temporary"),
        ];
        let experience_levels = vec![
            FacetValue::new("entry", "Entry Level"),
            FacetValue::new("mid", "Mid Level"),
            FacetValue::new("senior", "Senior Level"),
            FacetValue::new("lead", "Lead"),
            FacetValue::new("executive", "Executive"),
        ];
        let posted = vec![
            FacetValue::new("1", "Last 24 hours"),
            FacetValue::new("7", "Last 7 days"),
            FacetValue::new("30", "Last 30 days"),
            FacetValue::new("90", "Last 3 months"),
        ];
        let skills = vec![
            FacetValue::new("javascript", "JavaScript").with_subtitle("Programming Language"),
            FacetValue::new("react", "React").with_subtitle("Frontend Framework"),
            FacetValue::new("nodejs", "Node.js").with_subtitle("Backend Runtime"),
            FacetValue::new("python", "Python").with_subtitle("Programming Language"),
            FacetValue::new("go", "Go").with_subtitle("Programming Language"),
            FacetValue::new("docker", "Docker").with_subtitle("Containerization"),
            FacetValue::new("kubernetes", "Kubernetes").with_subtitle("Orchestration"),
            FacetValue::new("aws", "AWS").with_subtitle("Cloud Platform"),
        ];
        let locations = vec![
            FacetValue::new("san-francisco", "San Francisco, CA").with_subtitle("United States"),
            FacetValue::new("new-york", "New York, NY").with_subtitle("United States"),
            FacetValue::new("london", "London").with_subtitle("United Kingdom"),
            FacetValue::new("berlin", "Berlin").with_subtitle("Germany"),
            FacetValue::new("toronto", "Toronto").with_subtitle("Canada"),
            FacetValue::new("sydney", "Sydney").with_subtitle("Australia"),
        ];

        Self {
            facets: vec![
                FacetDefinition::new("workMode", "Work Mode", FacetKind::SingleSelect, JobField::WorkMode)
                    .with_candidates(work_modes),
                FacetDefinition::new("skills", "Skills", FacetKind::FreeTextAutocomplete, JobField::Skills)
                    .with_candidates(skills)
                    .with_suggestion_limit(8),
                FacetDefinition::new("jobType", "Job Type", FacetKind::MultiSelect, JobField::JobType)
                    .with_candidates(job_types),
                FacetDefinition::new(
                    "experienceLevel",
                    "Experience Level",
                    FacetKind::MultiSelect,
                    JobField::ExperienceLevel,
                )
                .with_candidates(experience_levels),
                FacetDefinition::new("location", "Location", FacetKind::FreeTextAutocomplete, JobField::Location)
                    .with_candidates(locations)
                    .single_value()
                    .with_suggestion_limit(6),
                FacetDefinition::new("postedDuration", "Posted", FacetKind::SingleSelect, JobField::PostedAt)
                    .with_candidates(posted),
                FacetDefinition::new("isRemote", "Remote Only", FacetKind::Boolean, JobField::IsRemote),
                FacetDefinition::new(
                    "visaSponsorship",
                    "Visa Sponsorship",
                    FacetKind::Boolean,
                    JobField::VisaSponsorship,
                ),
            ],
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    facets: Vec<FacetDefinition>,
}

fn validate_facet(facet: &FacetDefinition) -> Result<(), CatalogError> {
    let key = facet.key.as_str();
    if key.trim().is_empty() {
        return Err(CatalogError::EmptyKey);
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(CatalogError::ReservedKey(key.to_string()));
    }

    let invalid = |reason: &str| CatalogError::InvalidBinding {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    match facet.kind {
        FacetKind::Boolean => {
            if !facet.field.is_flag() {
                return Err(invalid("boolean facets must bind isRemote or visaSponsorship"));
            }
            if !facet.candidates.is_empty() {
                return Err(invalid("boolean facets take no candidates"));
            }
        }
        _ if facet.field.is_flag() => {
            return Err(invalid("flag fields need a boolean facet"));
        }
        _ => {}
    }

    if facet.field == JobField::PostedAt {
        if !matches!(facet.kind, FacetKind::SingleSelect | FacetKind::MultiSelect) {
            return Err(invalid("postedAt facets must be single- or multi-select"));
        }
        if let Some(bad) = facet.candidates.iter().find(|c| c.id.parse::<u32>().is_err()) {
            return Err(invalid(&format!("posted window '{}' is not a day count", bad.id)));
        }
    }

    if facet.single_value && facet.kind != FacetKind::FreeTextAutocomplete {
        return Err(invalid("only free-text facets can be single-value"));
    }

    let mut ids = HashSet::new();
    let mut titles = HashSet::new();
    for candidate in &facet.candidates {
        if !ids.insert(candidate.id.as_str()) {
            return Err(CatalogError::DuplicateCandidate {
                key: key.to_string(),
                id: candidate.id.clone(),
            });
        }
        // Free-text picks travel in URLs by title.
        if facet.kind == FacetKind::FreeTextAutocomplete && !titles.insert(fold_title(&candidate.title)) {
            return Err(CatalogError::DuplicateCandidate {
                key: key.to_string(),
                id: candidate.title.clone(),
            });
        }
    }
    Ok(())
}
