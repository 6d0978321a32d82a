//! Search and filter view-model.
//!
//! The free-text query is synchronized with the page URL in both directions:
//! URL changes update the query without re-navigating, and user edits - after
//! a debounce interval - navigate to rewrite the URL. A guard flag marks
//! "query changed because the URL changed" so the debounce timer can swallow
//! that echo instead of navigating again (which would loop).
//!
//! The debounce timer is the only scheduling primitive here: restarted on
//! every keystroke, cleared on drop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::services::Product;

/// Target of a search navigation, injected by the embedding view.
///
/// Called with the view-model locked: an implementation that needs to call
/// back into the view-model (e.g. a navigation that re-syncs the URL) must
/// defer that work instead of doing it inline.
pub trait Navigator: Send {
    /// Navigate to `target` (e.g. `/?q=lamp` or `/`).
    fn navigate(&mut self, target: &str);
}

impl<F> Navigator for F
where
    F: FnMut(&str) + Send,
{
    fn navigate(&mut self, target: &str) {
        self(target);
    }
}

struct SearchState {
    query: String,
    category: String,
    /// Set when the query was just overwritten from the URL; the next timer
    /// to fire consumes it silently.
    syncing_from_url: bool,
    /// Bumped on every (re)start; a woken timer with a stale generation has
    /// been superseded and does nothing.
    generation: u64,
    pending: Option<tokio::task::JoinHandle<()>>,
    navigator: Box<dyn Navigator>,
}

/// View-model for the search box and the category selector.
pub struct SearchViewModel {
    state: Arc<Mutex<SearchState>>,
    debounce: Duration,
}

impl SearchViewModel {
    /// Create a view-model with the given debounce interval.
    pub fn new(debounce: Duration, navigator: impl Navigator + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(SearchState {
                query: String::new(),
                category: "all".to_string(),
                syncing_from_url: false,
                generation: 0,
                pending: None,
                navigator: Box::new(navigator),
            })),
            debounce,
        }
    }

    /// The current query text.
    #[must_use]
    pub fn query(&self) -> String {
        self.lock().query.clone()
    }

    /// The current category selector value (`"all"` by default).
    #[must_use]
    pub fn category(&self) -> String {
        self.lock().category.clone()
    }

    /// Change the category selector. Purely local; never navigates.
    pub fn set_category(&self, category: &str) {
        self.lock().category = category.to_string();
    }

    /// The URL's `q` parameter changed (navigation happened elsewhere).
    ///
    /// Updates the query without triggering another navigation: the guard
    /// flag is set and the restarted timer consumes it when it fires.
    pub fn sync_from_url(&self, query: &str) {
        let mut state = self.lock();
        state.syncing_from_url = true;
        state.query = query.to_string();
        self.restart_timer(&mut state);
    }

    /// The user typed in the search box.
    ///
    /// Restarts the debounce timer; when it fires, the current query is
    /// navigated to exactly once.
    pub fn input(&self, query: &str) {
        let mut state = self.lock();
        state.query = query.to_string();
        self.restart_timer(&mut state);
    }

    /// The user pressed Enter: navigate immediately, bypassing the debounce.
    pub fn submit(&self) {
        let mut state = self.lock();
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
        state.generation += 1;
        state.syncing_from_url = false;

        let target = build_target(&state.query);
        state.navigator.navigate(&target);
    }

    /// Filter `products` with the current category and query.
    #[must_use]
    pub fn filter<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let state = self.lock();
        filter_products(products, &state.category, &state.query)
    }

    fn lock(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel any pending timer and start a fresh one.
    ///
    /// Must be called from within a Tokio runtime.
    fn restart_timer(&self, state: &mut SearchState) {
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        let shared = Arc::clone(&self.state);
        let debounce = self.debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation != generation {
                // Superseded by a later keystroke between wake-up and lock.
                return;
            }
            state.pending = None;

            if state.syncing_from_url {
                state.syncing_from_url = false;
                return;
            }

            let target = build_target(&state.query);
            state.navigator.navigate(&target);
        });

        state.pending = Some(handle);
    }
}

impl Drop for SearchViewModel {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().pending.take() {
            handle.abort();
        }
    }
}

/// Build the navigation target for a query: `/?q=<encoded>` for a non-empty
/// trimmed query, `/` otherwise.
fn build_target(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/?q={}", urlencoding::encode(trimmed))
    }
}

// =============================================================================
// Filtering
// =============================================================================

/// Conjunctive product filter: the category must match (or be `"all"`) and
/// the query must be empty or a case-insensitive substring of the product
/// name or catalogue name.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    category: &str,
    query: &str,
) -> Vec<&'a Product> {
    let needle = query.trim().to_lowercase();

    products
        .iter()
        .filter(|product| {
            let matches_category = category == "all" || product.category() == category;

            let matches_query = needle.is_empty()
                || product.product_name.to_lowercase().contains(&needle)
                || product
                    .catalogue_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle));

            matches_category && matches_query
        })
        .collect()
}

/// The category selector options: `"all"` plus every distinct product
/// category in first-seen order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut out = vec!["all".to_string()];
    for product in products {
        let category = product.category();
        if !out.iter().any(|existing| existing == category) {
            out.push(category.to_string());
        }
    }
    out
}
