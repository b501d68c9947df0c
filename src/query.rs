//! URL query string codec for filter state.
//!
//! One parameter per active facet, in catalog order. List values are
//! comma-joined with each item percent-encoded, so titles containing commas
//! ("San Francisco, CA") survive. Decoding never fails: unknown parameters
//! and values outside the catalog are dropped.

use std::borrow::Cow;

use tracing::debug;

use crate::catalog::FacetCatalog;
use crate::models::{FacetDefinition, FacetKind, FacetValue};
use crate::state::{FacetSelection, FilterState};

pub fn encode(catalog: &FacetCatalog, state: &FilterState) -> String {
    let mut pairs = Vec::new();
    for facet in catalog.iter() {
        let Some(selection) = state.get(&facet.key) else { continue };
        if selection.is_default() {
            continue;
        }
        let value = match selection {
            FacetSelection::Single(Some(id)) => encode_component(id),
            FacetSelection::Multi(ids) => join_list(ids.iter().map(String::as_str)),
            FacetSelection::Toggle(_) => "true".to_string(),
            FacetSelection::FreeText(values) => join_list(values.iter().map(|v| v.title.as_str())),
            FacetSelection::Single(None) => continue,
        };
        pairs.push(format!("{}={}", encode_component(&facet.key), value));
    }
    pairs.join("&")
}

pub fn decode(query: &str, catalog: &FacetCatalog) -> FilterState {
    let mut state = FilterState::new(catalog);
    for (key, raw) in parse_pairs(query) {
        let Some(facet) = catalog.get(&key) else {
            debug!(param = %key, "ignoring unknown query parameter");
            continue;
        };
        state.set(&facet.key, decode_selection(facet, &raw));
    }
    state
}

/// Splits a query string into percent-decoded keys and still-encoded values.
/// A leading `?` is allowed; a later duplicate key wins.
pub fn parse_pairs(query: &str) -> Vec<(String, String)> {
    let query = query.trim().trim_start_matches('?');
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            let key = decode_component(key)?;
            Some((key.into_owned(), value.to_string()))
        })
        .collect()
}

pub fn encode_component(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

/// Percent-decodes one component, treating `+` as a space. Invalid UTF-8
/// yields `None`.
pub fn decode_component(text: &str) -> Option<Cow<'_, str>> {
    if text.contains('+') {
        let spaced = text.replace('+', " ");
        return urlencoding::decode(&spaced)
            .ok()
            .map(|decoded| Cow::Owned(decoded.into_owned()));
    }
    urlencoding::decode(text).ok()
}

fn join_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(encode_component).collect::<Vec<_>>().join(",")
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|item| decode_component(item).map(Cow::into_owned))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn decode_selection(facet: &FacetDefinition, raw: &str) -> FacetSelection {
    let items = split_list(raw);
    match facet.kind {
        FacetKind::SingleSelect => {
            FacetSelection::Single(known_ids(facet, items).into_iter().next())
        }
        FacetKind::MultiSelect => FacetSelection::Multi(known_ids(facet, items)),
        FacetKind::Boolean => FacetSelection::Toggle(parse_flag(raw)),
        FacetKind::FreeTextAutocomplete => {
            let mut values: Vec<FacetValue> = Vec::new();
            for title in items {
                match facet.candidate_by_title(&title) {
                    Some(value) if !values.iter().any(|v| v.id == value.id) => values.push(value.clone()),
                    Some(_) => {}
                    None => debug!(facet = %facet.key, value = %title, "dropping unknown value"),
                }
            }
            if facet.single_value {
                values.truncate(1);
            }
            FacetSelection::FreeText(values)
        }
    }
}

fn known_ids(facet: &FacetDefinition, items: Vec<String>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in items {
        if facet.candidate(&id).is_none() {
            debug!(facet = %facet.key, value = %id, "dropping unknown value");
        } else if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Presence means true, except for an empty or explicitly negative value.
fn parse_flag(raw: &str) -> bool {
    let value = decode_component(raw).unwrap_or_default();
    !matches!(
        value.trim().to_lowercase().as_str(),
        "" | "false" | "0" | "no" | "off"
    )
}
