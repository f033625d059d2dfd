#[cfg(test)]
#[path = "feed_pager_test.rs"]
mod tests;

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::domain::models::BookApiBox;
use crate::domain::models::DeleteError;
use crate::domain::models::FailureKind;
use crate::domain::models::FeedItem;
use crate::domain::models::FeedPage;
use crate::domain::models::FetchError;
use crate::domain::models::SessionHandle;

/// Which list a pager walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FeedSource {
    /// Everyone's recommendations, newest first, fetched page by page.
    Community,
    /// The signed in user's own recommendations. The backend returns them in
    /// one go, so this source always has a single page.
    Mine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Initial,
    Refresh,
    More,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was merged and `added` new items were appended.
    Loaded { added: usize },
    /// Nothing was requested: another load is in flight or no pages remain.
    Skipped,
    /// The response arrived after a refresh or a session change and was
    /// dropped.
    Stale,
}

/// Point in time copy of the pager state for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub items: Vec<FeedItem>,
    pub page_number: u32,
    pub has_more: bool,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub deleting: Option<String>,
}

struct FeedState {
    items: Vec<FeedItem>,
    page_number: u32,
    has_more: bool,
    loading: Option<LoadKind>,
    deleting: Option<String>,
    // Bumped whenever the list is replaced, loads from an older epoch are
    // dropped.
    epoch: u64,
    // Bumped whenever the session changes, deletes from an older generation
    // are dropped.
    generation: u64,
    session: SessionHandle,
    token: Option<String>,
}

impl FeedState {
    fn new(session: SessionHandle) -> FeedState {
        let token = session.token();
        return FeedState {
            items: vec![],
            page_number: 0,
            has_more: true,
            loading: None,
            deleting: None,
            epoch: 0,
            generation: 0,
            session,
            token,
        };
    }

    fn clear(&mut self) {
        self.items.clear();
        self.page_number = 0;
        self.has_more = true;
        self.loading = None;
        self.deleting = None;
        self.epoch += 1;
    }

    /// Appends a page, skipping ids that are already listed, and recomputes
    /// `has_more` from the page count the backend just reported.
    fn merge(&mut self, page_number: u32, page: FeedPage) -> usize {
        let mut seen = self
            .items
            .iter()
            .map(|item| return item.id.to_string())
            .collect::<HashSet<String>>();

        let before = self.items.len();
        let received = page.items.len();
        for item in page.items {
            if seen.insert(item.id.to_string()) {
                self.items.push(item);
            }
        }

        let added = self.items.len() - before;
        if added < received {
            tracing::debug!(
                dropped = received - added,
                page = page_number,
                "Dropped duplicate feed items"
            );
        }

        self.page_number = page_number;
        self.has_more = page_number < page.total_pages;

        return added;
    }
}

/// Paginated, append only list of recommendations bound to a session.
///
/// All methods take `&self` so a screen can fire overlapping calls (fast
/// scrolling, pull to refresh) without coordinating them. The state lock is
/// never held across a request.
pub struct FeedPager {
    api: BookApiBox,
    source: FeedSource,
    page_size: u32,
    state: Mutex<FeedState>,
}

impl FeedPager {
    pub fn new(
        api: BookApiBox,
        session: SessionHandle,
        source: FeedSource,
        page_size: u32,
    ) -> FeedPager {
        return FeedPager {
            api,
            source,
            page_size: page_size.max(1),
            state: Mutex::new(FeedState::new(session)),
        };
    }

    pub fn source(&self) -> FeedSource {
        return self.source;
    }

    pub fn page_size(&self) -> u32 {
        return self.page_size;
    }

    /// Locks the state, first resetting it if the session was replaced since
    /// it was last looked at. A new login with the same token still resets.
    fn state(&self) -> MutexGuard<'_, FeedState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.session.take_changed() {
            tracing::debug!(source = %self.source, "Session changed, resetting feed");
            state.clear();
            state.generation += 1;
            state.token = state.session.token();
        }

        return state;
    }

    async fn request(&self, token: &str, page: u32, page_size: u32) -> Result<FeedPage, FetchError> {
        let res = match self.source {
            FeedSource::Community => self.api.feed_page(token, page, page_size).await,
            FeedSource::Mine => {
                if page > 1 {
                    return Ok(FeedPage {
                        items: vec![],
                        total_pages: 1,
                    });
                }

                self.api.user_books(token).await.map(|items| {
                    return FeedPage {
                        items,
                        total_pages: 1,
                    };
                })
            }
        };

        return res.map_err(|err| {
            tracing::error!(error = %err, source = %self.source, page, "Failed to fetch feed page");
            return FetchError::from(err);
        });
    }

    /// Fetches a single page with the current session without touching the
    /// list. Pages are 1-based; page 0 and a page size of 0 are rejected.
    pub async fn fetch_page(&self, page: u32, page_size: u32) -> Result<FeedPage, FetchError> {
        if page == 0 || page_size == 0 {
            return Err(FetchError::new(
                FailureKind::Invalid,
                &format!("Invalid page {page} of size {page_size}, both start at 1"),
            ));
        }

        let token = self.state().token.clone().ok_or_else(FetchError::unauthenticated)?;
        return self.request(&token, page, page_size).await;
    }

    /// Fetches page 1 and replaces the list with it.
    pub async fn load_initial(&self) -> Result<LoadOutcome, FetchError> {
        return self.replace(LoadKind::Initial).await;
    }

    /// Same as `load_initial`, reported as a refresh while in flight.
    pub async fn refresh(&self) -> Result<LoadOutcome, FetchError> {
        return self.replace(LoadKind::Refresh).await;
    }

    async fn replace(&self, kind: LoadKind) -> Result<LoadOutcome, FetchError> {
        let (epoch, token) = {
            let mut state = self.state();
            if matches!(state.loading, Some(LoadKind::Initial | LoadKind::Refresh)) {
                return Ok(LoadOutcome::Skipped);
            }
            let Some(token) = state.token.clone() else {
                return Err(FetchError::unauthenticated());
            };

            // Supersedes any load more still in flight.
            state.epoch += 1;
            state.loading = Some(kind);
            (state.epoch, token)
        };

        let res = self.request(&token, 1, self.page_size).await;

        let mut state = self.state();
        if state.epoch != epoch {
            return Ok(LoadOutcome::Stale);
        }
        state.loading = None;

        let page = res?;
        state.items.clear();
        state.page_number = 0;
        let added = state.merge(1, page);
        tracing::debug!(
            source = %self.source,
            items = added,
            has_more = state.has_more,
            "Loaded first page"
        );

        return Ok(LoadOutcome::Loaded { added });
    }

    /// Appends the next page. Does nothing while another load is in flight or
    /// once the last page was reached.
    pub async fn load_more(&self) -> Result<LoadOutcome, FetchError> {
        let (epoch, page_number, token) = {
            let mut state = self.state();
            if state.loading.is_some() || !state.has_more {
                return Ok(LoadOutcome::Skipped);
            }
            let Some(token) = state.token.clone() else {
                return Err(FetchError::unauthenticated());
            };

            state.loading = Some(LoadKind::More);
            (state.epoch, state.page_number + 1, token)
        };

        let res = self.request(&token, page_number, self.page_size).await;

        let mut state = self.state();
        if state.epoch != epoch {
            tracing::debug!(page = page_number, "Dropping stale feed page");
            return Ok(LoadOutcome::Stale);
        }
        state.loading = None;

        let page = res?;
        let added = state.merge(page_number, page);
        tracing::debug!(
            source = %self.source,
            page = page_number,
            items = added,
            has_more = state.has_more,
            "Loaded more"
        );

        return Ok(LoadOutcome::Loaded { added });
    }

    /// Deletes an item on the backend, then drops it from the list. Only one
    /// delete runs at a time; the list is left as is when it fails.
    pub async fn delete_item(&self, id: &str) -> Result<(), DeleteError> {
        let (generation, token) = {
            let mut state = self.state();
            let Some(token) = state.token.clone() else {
                return Err(DeleteError::unauthenticated());
            };
            if let Some(current) = &state.deleting {
                return Err(DeleteError::new(
                    FailureKind::Busy,
                    &format!("Still deleting recommendation {current}"),
                ));
            }

            state.deleting = Some(id.to_string());
            (state.generation, token)
        };

        let res = self.api.delete_book(&token, id).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(%id, "Session changed during delete, leaving feed untouched");
            return res.map(drop).map_err(DeleteError::from);
        }
        state.deleting = None;

        match res {
            Ok(message) => {
                state.items.retain(|item| return item.id != id);
                tracing::debug!(%id, message = %message, "Deleted recommendation");
                return Ok(());
            }
            Err(err) => {
                tracing::error!(error = %err, %id, "Failed to delete recommendation");
                return Err(DeleteError::from(err));
            }
        }
    }

    /// Empties the list and drops every response still in flight.
    pub fn reset(&self) {
        let mut state = self.state();
        state.clear();
        state.generation += 1;
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.state();
        return FeedSnapshot {
            items: state.items.clone(),
            page_number: state.page_number,
            has_more: state.has_more,
            is_loading: state.loading.is_some(),
            is_refreshing: state.loading == Some(LoadKind::Refresh),
            deleting: state.deleting.clone(),
        };
    }

    pub fn items(&self) -> Vec<FeedItem> {
        return self.state().items.clone();
    }

    pub fn len(&self) -> usize {
        return self.state().items.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.state().items.is_empty();
    }

    pub fn page_number(&self) -> u32 {
        return self.state().page_number;
    }

    pub fn has_more(&self) -> bool {
        return self.state().has_more;
    }

    pub fn is_loading(&self) -> bool {
        return self.state().loading.is_some();
    }

    pub fn is_refreshing(&self) -> bool {
        return self.state().loading == Some(LoadKind::Refresh);
    }

    /// Id of the item whose delete is in flight, if any.
    pub fn deleting(&self) -> Option<String> {
        return self.state().deleting.clone();
    }
}
