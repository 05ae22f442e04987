//! Rating aggregation.
//!
//! The mean is computed on demand from the store, never cached, and
//! returned unrounded. Rounding to one decimal is left to presentation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ReviewError;
use crate::store::ReviewStore;
use crate::types::{HotelId, Rating, ReviewStatus};

/// Which reviews are shown publicly and counted in the average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVisibility {
    /// Every review regardless of moderation status.
    #[default]
    All,
    /// Only reviews a moderator approved.
    ApprovedOnly,
}

impl ReviewVisibility {
    /// Parse from configuration (`all` or `approved`).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "approved" | "approved_only" => Some(Self::ApprovedOnly),
            _ => None,
        }
    }

    /// Whether a review with `status` is visible.
    pub fn admits(&self, status: ReviewStatus) -> bool {
        match self {
            Self::All => true,
            Self::ApprovedOnly => status == ReviewStatus::Approved,
        }
    }
}

/// Arithmetic mean of `ratings`, or `None` when empty.
///
/// Summed as integers, so the result is exact for any realistic count.
pub fn mean_rating(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u64 = ratings.iter().map(|r| r.value() as u64).sum();
    Some(sum as f64 / ratings.len() as f64)
}

/// Average and number of counted reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Unrounded mean, `None` when no review counts.
    pub average_rating: Option<f64>,
    /// Reviews included in the mean.
    pub review_count: usize,
}

/// Computes per-hotel rating aggregates from a review store.
pub struct RatingAggregator<S: ReviewStore> {
    store: Arc<S>,
    visibility: ReviewVisibility,
}

impl<S: ReviewStore> RatingAggregator<S> {
    /// Create an aggregator over `store`.
    pub fn new(store: Arc<S>, visibility: ReviewVisibility) -> Self {
        Self { store, visibility }
    }

    /// Mean rating of the hotel's visible reviews.
    pub async fn average_rating(&self, hotel_id: &HotelId) -> Result<Option<f64>, ReviewError> {
        Ok(self.summary(hotel_id).await?.average_rating)
    }

    /// Mean and count of the hotel's visible reviews.
    pub async fn summary(&self, hotel_id: &HotelId) -> Result<RatingSummary, ReviewError> {
        let ratings: Vec<Rating> = self
            .store
            .ratings_by_hotel(hotel_id)
            .await
            .map_err(Into::<ReviewError>::into)?
            .into_iter()
            .filter(|(_, status)| self.visibility.admits(*status))
            .map(|(rating, _)| rating)
            .collect();

        Ok(RatingSummary {
            average_rating: mean_rating(&ratings),
            review_count: ratings.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|&v| Rating::new(v).unwrap()).collect()
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(mean_rating(&[]), None);
    }

    #[test]
    fn test_exact_mean() {
        assert_eq!(mean_rating(&ratings(&[3, 5, 4])), Some(4.0));
        assert_eq!(mean_rating(&ratings(&[3, 5, 4, 2])), Some(3.5));
        assert_eq!(mean_rating(&ratings(&[1])), Some(1.0));
    }

    #[test]
    fn test_mean_is_unrounded() {
        let mean = mean_rating(&ratings(&[5, 4, 4])).unwrap();
        assert!((mean - 13.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_visibility_parse_and_admit() {
        assert_eq!(ReviewVisibility::from_str("ALL"), Some(ReviewVisibility::All));
        assert_eq!(ReviewVisibility::from_str("approved"), Some(ReviewVisibility::ApprovedOnly));
        assert_eq!(ReviewVisibility::from_str("some"), None);

        assert!(ReviewVisibility::All.admits(ReviewStatus::Rejected));
        assert!(!ReviewVisibility::ApprovedOnly.admits(ReviewStatus::Pending));
        assert!(ReviewVisibility::ApprovedOnly.admits(ReviewStatus::Approved));
    }
}
