//! # hotel-reviews
//!
//! Authenticated review lifecycle for a hotel catalog.
//!
//! Guests submit star ratings and free-text reviews, moderators approve or
//! reject them, and hotel pages show the reviews with an aggregate score.
//!
//! ## Architecture
//!
//! ```text
//! Request → AccessGuard → ReviewService → ReviewStore (Postgres or Memory)
//!              ↓                ↓
//!        TokenVerifier    RatingAggregator
//! ```
//!
//! ## Guarantees
//!
//! - A review's author is always the verified token's user
//! - A rejected credential never reaches the store
//! - `rating` is always within 1..=5
//! - `pending` is the only non-terminal status
//! - The average is `None` when a hotel has no reviews

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod review_service;
pub mod store;
pub mod types;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use aggregate::{mean_rating, RatingAggregator, RatingSummary, ReviewVisibility};
pub use auth::{
    issue_token, AccessGuard, AuthError, CacheConfig, CacheStats, SigningSecret, TokenVerifier,
    VerificationMode, VerifiedToken,
};
pub use config::{LogFormat, ServiceConfig};
pub use error::ReviewError;
pub use review_service::{HotelReviews, ReviewService, SubmitReview};
pub use store::{HotelCatalog, InMemoryHotelCatalog, InMemoryReviewStore, ReviewStore};
#[cfg(feature = "postgres")]
pub use store::{PostgresHotelCatalog, PostgresReviewStore};
pub use types::{
    sample_hotels, AuthorProjection, Claims, Hotel, HotelId, Identity, ModerationDecision, Rating,
    Review, ReviewDraft, ReviewId, ReviewListing, ReviewStatus, UserId,
};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};
