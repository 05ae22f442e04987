//! Review storage backends and the hotel catalog collaborator.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;

use crate::error::ReviewError;
use crate::types::{
    Hotel, HotelId, Rating, Review, ReviewDraft, ReviewId, ReviewListing, ReviewStatus,
};

/// Trait for review storage backends.
///
/// Every mutating call is all-or-nothing. Listings are returned in
/// insertion order.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Into<ReviewError> + Send + Sync + 'static;

    /// Validate and persist a draft as a new pending review.
    async fn insert(&self, draft: ReviewDraft) -> Result<Review, Self::Error>;

    /// Fetch a review by id.
    async fn get(&self, id: &ReviewId) -> Result<Option<Review>, Self::Error>;

    /// All reviews of a hotel, with authors resolved for display.
    async fn list_by_hotel(&self, hotel_id: &HotelId) -> Result<Vec<ReviewListing>, Self::Error>;

    /// Ratings and statuses of a hotel's reviews.
    async fn ratings_by_hotel(
        &self,
        hotel_id: &HotelId,
    ) -> Result<Vec<(Rating, ReviewStatus)>, Self::Error>;

    /// Move a pending review to a terminal status, optionally attaching a response.
    async fn set_moderation(
        &self,
        id: &ReviewId,
        status: ReviewStatus,
        response: Option<String>,
    ) -> Result<Review, Self::Error>;

    /// Whether the backend is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Read access to the hotel catalog, plus startup seeding.
#[async_trait]
pub trait HotelCatalog: Send + Sync {
    /// Look up a hotel.
    async fn get(&self, id: &HotelId) -> Result<Option<Hotel>, ReviewError>;

    /// All hotels.
    async fn list(&self) -> Result<Vec<Hotel>, ReviewError>;

    /// Insert `hotels` only if the catalog is empty. Returns how many were added.
    async fn seed_if_empty(&self, hotels: Vec<Hotel>) -> Result<usize, ReviewError>;
}

/// Error for a moderation request that changed nothing.
///
/// `current` is the stored status, `None` when the review does not exist.
/// Unknown ids are reported before any check on the target status.
pub(crate) fn moderation_rejected(
    id: &ReviewId,
    current: Option<ReviewStatus>,
    to: ReviewStatus,
) -> ReviewError {
    match current {
        None => ReviewError::not_found("review", id),
        Some(from) => ReviewError::InvalidTransition { from, to },
    }
}

pub use memory::{InMemoryHotelCatalog, InMemoryReviewStore};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresHotelCatalog, PostgresReviewStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_rejected_prefers_not_found() {
        let id = ReviewId::generate();
        assert!(matches!(
            moderation_rejected(&id, None, ReviewStatus::Pending),
            ReviewError::NotFound { entity: "review", .. }
        ));
        assert_eq!(
            moderation_rejected(&id, Some(ReviewStatus::Approved), ReviewStatus::Rejected),
            ReviewError::InvalidTransition {
                from: ReviewStatus::Approved,
                to: ReviewStatus::Rejected,
            }
        );
    }
}
