//! In-memory review store and hotel catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{moderation_rejected, HotelCatalog, ReviewStore};
use crate::error::ReviewError;
use crate::types::{
    Hotel, HotelId, Rating, Review, ReviewDraft, ReviewId, ReviewListing, ReviewStatus, UserId,
};

#[derive(Debug, Default)]
struct Inner {
    /// Reviews in insertion order.
    reviews: Vec<Review>,
    /// Review id -> position in `reviews`.
    index: HashMap<ReviewId, usize>,
}

/// In-memory review store.
///
/// A single lock guards the records; it is held only for the duration of
/// one insert or update.
#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    inner: RwLock<Inner>,
    /// User id -> display name.
    users: RwLock<HashMap<UserId, String>>,
}

impl InMemoryReviewStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a display name for author projections.
    pub fn register_user(&self, user_id: UserId, username: impl Into<String>) {
        self.users.write().insert(user_id, username.into());
    }

    /// Get number of reviews.
    pub fn num_reviews(&self) -> usize {
        self.inner.read().reviews.len()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    type Error = ReviewError;

    async fn insert(&self, draft: ReviewDraft) -> Result<Review, Self::Error> {
        let mut valid = draft.validate()?;
        if let Some(name) = valid.author_name.take() {
            self.register_user(valid.user_id.clone(), name);
        }
        let review = Review::from_valid_draft(valid);

        let mut inner = self.inner.write();
        let position = inner.reviews.len();
        inner.index.insert(review.id, position);
        inner.reviews.push(review.clone());

        Ok(review)
    }

    async fn get(&self, id: &ReviewId) -> Result<Option<Review>, Self::Error> {
        let inner = self.inner.read();
        Ok(inner.index.get(id).map(|&i| inner.reviews[i].clone()))
    }

    async fn list_by_hotel(&self, hotel_id: &HotelId) -> Result<Vec<ReviewListing>, Self::Error> {
        let reviews: Vec<Review> = self
            .inner
            .read()
            .reviews
            .iter()
            .filter(|r| &r.hotel_id == hotel_id)
            .cloned()
            .collect();

        let users = self.users.read();
        Ok(reviews
            .into_iter()
            .map(|review| {
                let username = users.get(&review.user_id).cloned();
                ReviewListing::new(review, username)
            })
            .collect())
    }

    async fn ratings_by_hotel(
        &self,
        hotel_id: &HotelId,
    ) -> Result<Vec<(Rating, ReviewStatus)>, Self::Error> {
        Ok(self
            .inner
            .read()
            .reviews
            .iter()
            .filter(|r| &r.hotel_id == hotel_id)
            .map(|r| (r.rating, r.status))
            .collect())
    }

    async fn set_moderation(
        &self,
        id: &ReviewId,
        status: ReviewStatus,
        response: Option<String>,
    ) -> Result<Review, Self::Error> {
        let mut inner = self.inner.write();
        let position = *inner
            .index
            .get(id)
            .ok_or_else(|| moderation_rejected(id, None, status))?;

        let review = &mut inner.reviews[position];
        review.moderate(status, response)?;
        Ok(review.clone())
    }
}

/// In-memory hotel catalog, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryHotelCatalog {
    hotels: RwLock<Vec<Hotel>>,
}

impl InMemoryHotelCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hotel.
    pub fn with_hotel(self, hotel: Hotel) -> Self {
        self.hotels.write().push(hotel);
        self
    }
}

#[async_trait]
impl HotelCatalog for InMemoryHotelCatalog {
    async fn get(&self, id: &HotelId) -> Result<Option<Hotel>, ReviewError> {
        Ok(self.hotels.read().iter().find(|h| &h.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Hotel>, ReviewError> {
        Ok(self.hotels.read().clone())
    }

    async fn seed_if_empty(&self, hotels: Vec<Hotel>) -> Result<usize, ReviewError> {
        let mut current = self.hotels.write();
        if !current.is_empty() {
            return Ok(0);
        }
        let added = hotels.len();
        current.extend(hotels);
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{sample_hotels, Claims, Identity};

    fn draft(user: &str, hotel: &str, rating: i64, text: &str) -> ReviewDraft {
        let identity = Identity::from_verified(Claims::new(UserId::new(user), 0, i64::MAX));
        ReviewDraft::from_identity(&identity, HotelId::new(hotel), rating, text)
    }

    #[tokio::test]
    async fn test_insert_assigns_pending() {
        let store = InMemoryReviewStore::new();
        let review = store.insert(draft("u1", "h1", 4, "Great stay")).await.unwrap();

        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.response, None);
        assert_eq!(store.get(&review.id).await.unwrap(), Some(review));
    }

    #[tokio::test]
    async fn test_invalid_insert_persists_nothing() {
        let store = InMemoryReviewStore::new();
        assert!(store.insert(draft("u1", "h1", 0, "")).await.is_err());
        assert!(store.insert(draft("u1", "", 3, "")).await.is_err());
        assert_eq!(store.num_reviews(), 0);
    }

    #[tokio::test]
    async fn test_list_by_hotel_keeps_insertion_order() {
        let store = InMemoryReviewStore::new();
        store.register_user(UserId::new("u2"), "bob");
        let first = store.insert(draft("u1", "h1", 2, "first")).await.unwrap();
        store.insert(draft("u1", "h2", 5, "elsewhere")).await.unwrap();
        let second = store.insert(draft("u2", "h1", 3, "second")).await.unwrap();

        let listing = store.list_by_hotel(&HotelId::new("h1")).await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, first.id);
        assert_eq!(listing[0].user_id.username, None);
        assert_eq!(listing[1].id, second.id);
        assert_eq!(listing[1].user_id.username.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_set_moderation() {
        let store = InMemoryReviewStore::new();
        let review = store.insert(draft("u1", "h1", 4, "ok")).await.unwrap();

        let moderated = store
            .set_moderation(&review.id, ReviewStatus::Approved, Some("Thank you".into()))
            .await
            .unwrap();
        assert_eq!(moderated.status, ReviewStatus::Approved);
        assert_eq!(moderated.response.as_deref(), Some("Thank you"));
        assert!(moderated.moderated_at.is_some());

        let again = store.set_moderation(&review.id, ReviewStatus::Rejected, None).await;
        assert!(matches!(again, Err(ReviewError::InvalidTransition { .. })));
        assert_eq!(store.get(&review.id).await.unwrap().unwrap().status, ReviewStatus::Approved);
    }

    #[tokio::test]
    async fn test_insert_records_token_username() {
        let store = InMemoryReviewStore::new();
        let claims = Claims::new(UserId::new("u9"), 0, i64::MAX).with_username("carol");
        let identity = Identity::from_verified(claims);
        store
            .insert(ReviewDraft::from_identity(&identity, HotelId::new("h1"), 5, ""))
            .await
            .unwrap();

        let listing = store.list_by_hotel(&HotelId::new("h1")).await.unwrap();
        assert_eq!(listing[0].user_id.username.as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn test_set_moderation_unknown_id() {
        let store = InMemoryReviewStore::new();
        let result = store
            .set_moderation(&ReviewId::generate(), ReviewStatus::Approved, None)
            .await;
        assert!(matches!(result, Err(ReviewError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found_for_any_target() {
        let store = InMemoryReviewStore::new();
        for target in [ReviewStatus::Pending, ReviewStatus::Approved, ReviewStatus::Rejected] {
            let result = store.set_moderation(&ReviewId::generate(), target, None).await;
            assert!(matches!(result, Err(ReviewError::NotFound { entity: "review", .. })));
        }
    }

    #[tokio::test]
    async fn test_ratings_by_hotel() {
        let store = InMemoryReviewStore::new();
        store.insert(draft("u1", "h1", 3, "")).await.unwrap();
        store.insert(draft("u1", "h1", 5, "")).await.unwrap();

        let ratings = store.ratings_by_hotel(&HotelId::new("h1")).await.unwrap();
        let values: Vec<u8> = ratings.iter().map(|(r, _)| r.value()).collect();
        assert_eq!(values, vec![3, 5]);
        assert!(store.ratings_by_hotel(&HotelId::new("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_seeds_only_once() {
        let catalog = InMemoryHotelCatalog::new();
        assert_eq!(catalog.seed_if_empty(sample_hotels()).await.unwrap(), 3);
        assert_eq!(catalog.seed_if_empty(sample_hotels()).await.unwrap(), 0);

        let hotels = catalog.list().await.unwrap();
        assert_eq!(hotels.len(), 3);
        assert_eq!(hotels[0].name, "Grand Luxury Hotel");
        assert_eq!(catalog.get(&hotels[1].id).await.unwrap().unwrap().name, "City Comfort Inn");
    }
}
