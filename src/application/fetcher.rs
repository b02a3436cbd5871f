//! Paginated relationship set fetcher.

use tracing::{debug, info, warn};

use super::cancel::CancelSignal;
use super::governed::GovernedApi;
use crate::domain::{RelationKind, RelationshipSet, RelationshipSetBuilder};
use crate::error::{Error, Result};
use crate::port::list_resource;

/// Page size and page cap for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            per_page: 100,
            max_pages: 1_000,
        }
    }
}

/// Reconstructs a complete relationship set from a paginated endpoint.
///
/// A failure on any page discards everything fetched so far: a
/// truncated set would silently corrupt classification.
#[derive(Clone)]
pub struct SetFetcher {
    api: GovernedApi,
    settings: FetchSettings,
}

impl SetFetcher {
    pub fn new(api: GovernedApi, settings: FetchSettings) -> Self {
        Self { api, settings }
    }

    #[must_use]
    pub const fn settings(&self) -> FetchSettings {
        self.settings
    }

    #[must_use]
    pub fn api(&self) -> &GovernedApi {
        &self.api
    }

    pub async fn fetch_all(
        &self,
        kind: RelationKind,
        cancel: &CancelSignal,
    ) -> Result<RelationshipSet> {
        let per_page = self.settings.per_page;
        let mut builder = RelationshipSetBuilder::new(kind);
        let mut page = 1;

        info!(%kind, per_page, "Fetching relationship set");

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if page > self.settings.max_pages {
                warn!(%kind, max_pages = self.settings.max_pages, "Page cap reached");
                return Err(Error::PageLimitExceeded {
                    kind,
                    max_pages: self.settings.max_pages,
                });
            }

            let response = match self.api.list_page(kind, page, per_page, cancel).await {
                Ok(response) => response,
                Err(Error::Api(source)) => return Err(Error::FetchFailed { kind, page, source }),
                Err(err) => return Err(err),
            };

            let entities = response
                .into_result(&list_resource(kind))
                .map_err(|source| Error::FetchFailed { kind, page, source })?;

            let returned = entities.len();
            builder.extend(entities);
            debug!(%kind, page, returned, total = builder.len(), "Fetched page");

            if returned < per_page as usize {
                break;
            }
            page += 1;
        }

        if builder.duplicates() > 0 {
            warn!(%kind, duplicates = builder.duplicates(), "Dropped duplicate ids across pages");
        }
        info!(%kind, pages = page, total = builder.len(), "Relationship set complete");

        Ok(builder.finish())
    }
}
