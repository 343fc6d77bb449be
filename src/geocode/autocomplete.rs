//! Debounced address typeahead for the memory editor.
//!
//! Independent of the map; it only shares the [`GeocodeService`]. Each
//! keystroke restarts the debounce, and responses are tagged with the
//! input generation that produced them so a slow reply for old text can
//! never overwrite suggestions for newer text.

use std::time::Duration;

use tokio::time::Instant;

use super::{GeocodeError, GeocodeService, Place};
use crate::config::AutocompleteConfig;

/// What the input field should do after a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Too short: suggestions were cleared and the list closed.
    Cleared,
    /// A lookup will be due at this instant unless more input arrives.
    Scheduled(Instant),
}

/// A lookup that is due, tagged with the input generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionQuery {
    pub text: String,
    pub generation: u64,
}

#[derive(Debug)]
pub struct AddressAutocomplete {
    min_chars: usize,
    debounce: Duration,
    limit: usize,
    input: String,
    generation: u64,
    due: Option<Instant>,
    suggestions: Vec<Place>,
    open: bool,
}

impl AddressAutocomplete {
    pub fn new(config: &AutocompleteConfig) -> Self {
        Self {
            min_chars: config.min_chars,
            debounce: config.debounce(),
            limit: config.limit,
            input: String::new(),
            generation: 0,
            due: None,
            suggestions: Vec::new(),
            open: false,
        }
    }

    /// The field's text changed.
    pub fn on_input(&mut self, text: &str, now: Instant) -> InputAction {
        self.input = text.to_string();
        self.generation += 1;
        if text.chars().count() < self.min_chars {
            self.due = None;
            self.suggestions.clear();
            self.open = false;
            return InputAction::Cleared;
        }
        let due = now + self.debounce;
        self.due = Some(due);
        InputAction::Scheduled(due)
    }

    /// Take the pending lookup once its debounce has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<SuggestionQuery> {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                Some(SuggestionQuery {
                    text: self.input.clone(),
                    generation: self.generation,
                })
            }
            _ => None,
        }
    }

    /// Instant the next lookup becomes due, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.due
    }

    /// Store results for `query`. Returns `false` if the input moved on since.
    pub fn apply(&mut self, query: &SuggestionQuery, result: Result<Vec<Place>, GeocodeError>) -> bool {
        if query.generation != self.generation {
            tracing::debug!(text = %query.text, "dropping stale suggestions");
            return false;
        }
        match result {
            Ok(places) => {
                self.suggestions = places;
                self.suggestions.truncate(self.limit);
                self.open = true;
            }
            Err(e) => {
                tracing::warn!(text = %query.text, error = %e, "autocomplete lookup failed");
            }
        }
        true
    }

    /// Pick a suggestion. The field takes its display name and the list closes.
    pub fn select(&mut self, index: usize) -> Option<String> {
        let chosen = self.suggestions.get(index)?.display_name.clone();
        self.input = chosen.clone();
        self.generation += 1;
        self.due = None;
        self.suggestions.clear();
        self.open = false;
        Some(chosen)
    }

    /// Close the list without changing the input (click outside).
    pub fn dismiss(&mut self) {
        self.open = false;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_open(&self) -> bool {
        self.open && !self.suggestions.is_empty()
    }

    pub fn suggestions(&self) -> &[Place] {
        &self.suggestions
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Run the lookup for a due query.
pub async fn fetch<S: GeocodeService + ?Sized>(
    service: &S,
    query: &SuggestionQuery,
    limit: usize,
) -> Result<Vec<Place>, GeocodeError> {
    service.search(&query.text, limit).await
}
