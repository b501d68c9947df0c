use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One selectable candidate of a facet (a skill, a location, a work mode...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetValue {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl FacetValue {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    SingleSelect,
    MultiSelect,
    Boolean,
    FreeTextAutocomplete,
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacetKind::SingleSelect => "single-select",
            FacetKind::MultiSelect => "multi-select",
            FacetKind::Boolean => "boolean",
            FacetKind::FreeTextAutocomplete => "free-text",
        };
        f.write_str(name)
    }
}

/// The job record field a facet constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobField {
    WorkMode,
    JobType,
    ExperienceLevel,
    Skills,
    Location,
    IsRemote,
    VisaSponsorship,
    PostedAt,
}

impl JobField {
    pub fn is_flag(self) -> bool {
        matches!(self, JobField::IsRemote | JobField::VisaSponsorship)
    }
}

pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

fn default_suggestion_limit() -> usize {
    DEFAULT_SUGGESTION_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetDefinition {
    pub key: String,
    pub label: String,
    pub kind: FacetKind,
    pub field: JobField,
    #[serde(default)]
    pub candidates: Vec<FacetValue>,
    /// Free-text facets only: hold at most one selection.
    #[serde(default)]
    pub single_value: bool,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

impl FacetDefinition {
    pub fn new(key: &str, label: &str, kind: FacetKind, field: JobField) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            field,
            candidates: Vec::new(),
            single_value: false,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<FacetValue>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn single_value(mut self) -> Self {
        self.single_value = true;
        self
    }

    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    pub fn candidate(&self, id: &str) -> Option<&FacetValue> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn candidate_by_title(&self, title: &str) -> Option<&FacetValue> {
        let wanted = fold_title(title);
        self.candidates.iter().find(|c| fold_title(&c.title) == wanted)
    }
}

/// Case folding for title lookups and title uniqueness.
pub(crate) fn fold_title(title: &str) -> String {
    title.to_lowercase()
}

/// A job posting as the engine sees it. Owned by the data source; the engine
/// only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub work_mode: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub experience_level: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub visa_sponsorship: bool,
    pub posted_at: DateTime<Utc>,
}

impl JobRecord {
    /// Text values of a field, for membership tests. Flag and timestamp
    /// fields have none.
    pub fn text_values(&self, field: JobField) -> Vec<&str> {
        match field {
            JobField::WorkMode => vec![self.work_mode.as_str()],
            JobField::JobType => vec![self.job_type.as_str()],
            JobField::ExperienceLevel => vec![self.experience_level.as_str()],
            JobField::Location => vec![self.location.as_str()],
            JobField::Skills => self.skills.iter().map(String::as_str).collect(),
            JobField::IsRemote | JobField::VisaSponsorship | JobField::PostedAt => Vec::new(),
        }
    }

    pub fn flag(&self, field: JobField) -> Option<bool> {
        match field {
            JobField::IsRemote => Some(self.is_remote),
            JobField::VisaSponsorship => Some(self.visa_sponsorship),
            _ => None,
        }
    }
}
