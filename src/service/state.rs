//! Shared service state.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::AccessGuard;
use crate::config::ServiceConfig;
use crate::review_service::ReviewService;
use crate::store::{HotelCatalog, ReviewStore};

/// State shared by all request handlers.
///
/// Cloning is cheap; every clone refers to the same review service.
pub struct ServiceState<S: ReviewStore + 'static> {
    /// The review lifecycle.
    pub reviews: Arc<ReviewService<S>>,
    started_at: Instant,
}

impl<S: ReviewStore + 'static> ServiceState<S> {
    /// Wrap an assembled review service.
    pub fn new(reviews: ReviewService<S>) -> Self {
        Self {
            reviews: Arc::new(reviews),
            started_at: Instant::now(),
        }
    }

    /// Assemble the review service from configuration and backends.
    pub fn from_config(config: &ServiceConfig, store: S, catalog: Arc<dyn HotelCatalog>) -> Self {
        if config.signing_secret.is_none() {
            tracing::error!(
                "SECRET_KEY not set or empty. Every authenticated request will be rejected."
            );
        }

        let guard = AccessGuard::new(Arc::new(config.token_verifier()));
        Self::new(ReviewService::with_visibility(
            guard,
            Arc::new(store),
            catalog,
            config.visibility,
        ))
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl<S: ReviewStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            reviews: Arc::clone(&self.reviews),
            started_at: self.started_at,
        }
    }
}
