//! Review service: orchestrates submission, retrieval and moderation.
//!
//! ## Consistency
//!
//! Every store call is atomic on its own, but nothing spans calls.
//! [`ReviewService::hotel_reviews`] reads the listing and the average
//! separately, so a concurrent submission may be reflected in one and not
//! the other. Clients re-fetch both after submitting.

use std::sync::Arc;

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{RatingAggregator, RatingSummary, ReviewVisibility};
use crate::auth::AccessGuard;
use crate::error::ReviewError;
use crate::store::{HotelCatalog, ReviewStore};
use crate::types::{
    Hotel, HotelId, Identity, ModerationDecision, Review, ReviewDraft, ReviewId, ReviewListing,
};

/// Body of a review submission.
///
/// A `userId` field is tolerated for client compatibility but never used:
/// the author is always the authenticated caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReview {
    /// Ignored; kept so existing clients can keep sending it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<serde_json::Value>,
    /// Target hotel.
    #[serde(default)]
    pub hotel_id: Option<String>,
    /// Star rating, 1 to 5.
    #[serde(default)]
    pub rating: Option<i64>,
    /// Free text.
    #[serde(default)]
    pub review_text: Option<String>,
}

impl SubmitReview {
    /// Build a submission body.
    pub fn new(hotel_id: impl Into<String>, rating: i64, review_text: impl Into<String>) -> Self {
        Self {
            user_id: None,
            hotel_id: Some(hotel_id.into()),
            rating: Some(rating),
            review_text: Some(review_text.into()),
        }
    }
}

/// Reviews of one hotel together with their average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelReviews {
    /// Visible reviews in insertion order.
    pub reviews: Vec<ReviewListing>,
    /// Unrounded mean of the visible ratings.
    pub average_rating: Option<f64>,
}

/// Entry point for the review lifecycle.
pub struct ReviewService<S: ReviewStore> {
    guard: AccessGuard,
    store: Arc<S>,
    catalog: Arc<dyn HotelCatalog>,
    aggregator: RatingAggregator<S>,
    visibility: ReviewVisibility,
}

impl<S: ReviewStore> ReviewService<S> {
    /// Create a service showing every review.
    pub fn new(guard: AccessGuard, store: Arc<S>, catalog: Arc<dyn HotelCatalog>) -> Self {
        Self::with_visibility(guard, store, catalog, ReviewVisibility::default())
    }

    /// Create a service with an explicit visibility policy.
    pub fn with_visibility(
        guard: AccessGuard,
        store: Arc<S>,
        catalog: Arc<dyn HotelCatalog>,
        visibility: ReviewVisibility,
    ) -> Self {
        Self {
            aggregator: RatingAggregator::new(Arc::clone(&store), visibility),
            guard,
            store,
            catalog,
            visibility,
        }
    }

    /// The access guard in front of mutating operations.
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The active visibility policy.
    pub fn visibility(&self) -> ReviewVisibility {
        self.visibility
    }

    /// Authenticate the request, then persist the review as pending.
    ///
    /// Authentication runs first; a rejected caller never reaches the store.
    pub async fn submit(
        &self,
        headers: &HeaderMap,
        request: SubmitReview,
    ) -> Result<Review, ReviewError> {
        let identity = self.guard.authenticate(headers)?;
        self.submit_as(&identity, request).await
    }

    /// Persist a review authored by an already authenticated caller.
    pub async fn submit_as(
        &self,
        identity: &Identity,
        request: SubmitReview,
    ) -> Result<Review, ReviewError> {
        if let Some(claimed) = &request.user_id {
            if claimed.as_str() != Some(identity.user_id().as_str()) {
                warn!(
                    user_id = %identity.user_id(),
                    claimed_user_id = %claimed,
                    "ignoring userId in submission body"
                );
            }
        }

        let hotel_id = request
            .hotel_id
            .filter(|id| !id.trim().is_empty())
            .map(HotelId::new)
            .ok_or_else(|| ReviewError::validation("hotelId", "is required"))?;
        let rating = request
            .rating
            .ok_or_else(|| ReviewError::validation("rating", "is required"))?;

        if self.catalog.get(&hotel_id).await?.is_none() {
            return Err(ReviewError::not_found("hotel", &hotel_id));
        }

        let draft = ReviewDraft::from_identity(
            identity,
            hotel_id,
            rating,
            request.review_text.unwrap_or_default(),
        );
        let review = self.store.insert(draft).await.map_err(Into::<ReviewError>::into)?;

        info!(
            review_id = %review.id,
            hotel_id = %review.hotel_id,
            user_id = %review.user_id,
            rating = review.rating.value(),
            "review submitted"
        );
        Ok(review)
    }

    /// Visible reviews of a hotel, in insertion order.
    pub async fn list_reviews(
        &self,
        hotel_id: &HotelId,
    ) -> Result<Vec<ReviewListing>, ReviewError> {
        let reviews = self
            .store
            .list_by_hotel(hotel_id)
            .await
            .map_err(Into::<ReviewError>::into)?;
        Ok(reviews
            .into_iter()
            .filter(|r| self.visibility.admits(r.status))
            .collect())
    }

    /// Unrounded mean rating of a hotel, `None` without reviews.
    pub async fn average_rating(&self, hotel_id: &HotelId) -> Result<Option<f64>, ReviewError> {
        self.aggregator.average_rating(hotel_id).await
    }

    /// Mean rating and number of counted reviews.
    pub async fn rating_summary(&self, hotel_id: &HotelId) -> Result<RatingSummary, ReviewError> {
        self.aggregator.summary(hotel_id).await
    }

    /// Reviews and average of a hotel, read independently.
    pub async fn hotel_reviews(&self, hotel_id: &HotelId) -> Result<HotelReviews, ReviewError> {
        let reviews = self.list_reviews(hotel_id).await?;
        let average_rating = self.average_rating(hotel_id).await?;
        Ok(HotelReviews {
            reviews,
            average_rating,
        })
    }

    /// Record a moderation decision on a pending review.
    ///
    /// An empty response is treated as no response.
    pub async fn moderate(
        &self,
        id: &ReviewId,
        decision: ModerationDecision,
        response: Option<String>,
    ) -> Result<Review, ReviewError> {
        let response = response.filter(|r| !r.trim().is_empty());
        let review = self
            .store
            .set_moderation(id, decision.into(), response)
            .await
            .map_err(Into::<ReviewError>::into)?;

        info!(
            review_id = %review.id,
            status = %review.status,
            has_response = review.response.is_some(),
            "review moderated"
        );
        Ok(review)
    }

    /// All hotels in the catalog.
    pub async fn hotels(&self) -> Result<Vec<Hotel>, ReviewError> {
        self.catalog.list().await
    }

    /// One hotel, or `NotFound`.
    pub async fn hotel(&self, id: &HotelId) -> Result<Hotel, ReviewError> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| ReviewError::not_found("hotel", id))
    }
}
