use std::collections::HashSet;

use crate::error::DispatchError;
use crate::settlements::model::Settlement;

/// The selected ids with repeats removed, first occurrence kept.
pub fn dedup_selection(selected_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    selected_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Resolve the selected settlement ids to a recipient list.
///
/// Settlements are taken in collection order; addresses are deduplicated
/// keeping the first occurrence. Every selected id must resolve: unknown
/// ids and drivers without an email are each reported at once so the
/// operator can fix the whole selection.
pub fn resolve_recipients(
    settlements: &[Settlement],
    selected_ids: &[String],
) -> Result<Vec<String>, DispatchError> {
    if selected_ids.is_empty() {
        return Err(DispatchError::EmptySelection);
    }

    let wanted: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
    let selected: Vec<&Settlement> = settlements
        .iter()
        .filter(|s| wanted.contains(s.id.as_str()))
        .collect();

    if selected.is_empty() {
        return Err(DispatchError::NoRecipients);
    }

    let known: HashSet<&str> = selected.iter().map(|s| s.id.as_str()).collect();
    let unknown: Vec<String> = dedup_selection(selected_ids)
        .into_iter()
        .filter(|id| !known.contains(id.as_str()))
        .collect();
    if !unknown.is_empty() {
        return Err(DispatchError::UnknownSettlements { ids: unknown });
    }

    let missing: Vec<String> = selected
        .iter()
        .filter(|s| s.email().is_none())
        .map(|s| s.display_name())
        .collect();
    if !missing.is_empty() {
        return Err(DispatchError::MissingEmails { names: missing });
    }

    let mut seen = HashSet::new();
    let recipients = selected
        .iter()
        .filter_map(|s| s.email())
        .filter(|email| seen.insert(*email))
        .map(str::to_string)
        .collect();

    Ok(recipients)
}
