//! Core types for the review lifecycle.

pub mod claims;
pub mod hotel;
pub mod review;

pub use claims::{Claims, Identity};
pub use hotel::{sample_hotels, Hotel, HotelId};
pub use review::{
    AuthorProjection, ModerationDecision, Rating, Review, ReviewDraft, ReviewId,
    ReviewListing, ReviewStatus, UserId, ValidDraft,
};
