//! Review records and the moderation state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::claims::Identity;
use super::hotel::HotelId;
use crate::error::ReviewError;

/// Unique identifier for a stored review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(Uuid);

impl ReviewId {
    /// Create a ReviewId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh random ReviewId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the authoring user, as asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a raw user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A star rating, always within `[Rating::MIN, Rating::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: i64 = 1;
    /// Highest accepted rating.
    pub const MAX: i64 = 5;

    /// Validate a raw rating value.
    pub fn new(value: i64) -> Result<Self, ReviewError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ReviewError::validation(
                "rating",
                format!(
                    "must be an integer between {} and {}, got {}",
                    Self::MIN,
                    Self::MAX,
                    value
                ),
            ))
        }
    }

    /// The rating as an integer.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Rating::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Moderation status of a review.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Awaiting moderation.
    #[default]
    Pending,
    /// Accepted by a moderator.
    Approved,
    /// Declined by a moderator.
    Rejected,
}

impl ReviewStatus {
    /// Parse status from its lowercase name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Lowercase name, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether no further transition is accepted.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check `self -> next` against the state machine.
    pub fn transition(self, next: ReviewStatus) -> Result<ReviewStatus, ReviewError> {
        match (self, next) {
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected) => Ok(next),
            _ => Err(ReviewError::InvalidTransition { from: self, to: next }),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome a moderator can assign to a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    /// Move to `approved`.
    Approve,
    /// Move to `rejected`.
    Reject,
}

impl From<ModerationDecision> for ReviewStatus {
    fn from(decision: ModerationDecision) -> Self {
        match decision {
            ModerationDecision::Approve => ReviewStatus::Approved,
            ModerationDecision::Reject => ReviewStatus::Rejected,
        }
    }
}

/// A persisted review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Store-assigned identifier.
    pub id: ReviewId,
    /// Author.
    pub user_id: UserId,
    /// Reviewed hotel.
    pub hotel_id: HotelId,
    /// Star rating.
    pub rating: Rating,
    /// Free text, possibly empty.
    pub review_text: String,
    /// Moderation status.
    pub status: ReviewStatus,
    /// Moderator reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// When the store accepted the review.
    pub created_at: DateTime<Utc>,
    /// When the review left `pending`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderated_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Build a freshly inserted review from validated draft parts.
    pub fn from_valid_draft(draft: ValidDraft) -> Self {
        Self {
            id: ReviewId::generate(),
            user_id: draft.user_id,
            hotel_id: draft.hotel_id,
            rating: draft.rating,
            review_text: draft.review_text,
            status: ReviewStatus::Pending,
            response: None,
            created_at: Utc::now(),
            moderated_at: None,
        }
    }

    /// Apply a moderation decision in place.
    ///
    /// Leaves the review untouched on error.
    pub fn moderate(
        &mut self,
        next: ReviewStatus,
        response: Option<String>,
    ) -> Result<(), ReviewError> {
        let status = self.status.transition(next)?;
        self.status = status;
        self.response = response;
        self.moderated_at = Some(Utc::now());
        Ok(())
    }
}

/// Unvalidated input for creating a review.
///
/// The author can only be taken from a verified [`Identity`], so a draft
/// cannot name a user other than the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    user_id: UserId,
    author_name: Option<String>,
    /// Target hotel.
    pub hotel_id: HotelId,
    /// Raw rating, checked by [`ReviewDraft::validate`].
    pub rating: i64,
    /// Free text.
    pub review_text: String,
}

impl ReviewDraft {
    /// Start a draft authored by the verified caller.
    pub fn from_identity(
        identity: &Identity,
        hotel_id: HotelId,
        rating: i64,
        review_text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: identity.user_id().clone(),
            author_name: identity.username().map(str::to_string),
            hotel_id,
            rating,
            review_text: review_text.into(),
        }
    }

    /// The author carried by this draft.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Check field invariants.
    pub fn validate(self) -> Result<ValidDraft, ReviewError> {
        if self.user_id.as_str().trim().is_empty() {
            return Err(ReviewError::validation("userId", "is required"));
        }
        if self.hotel_id.as_str().trim().is_empty() {
            return Err(ReviewError::validation("hotelId", "is required"));
        }
        let rating = Rating::new(self.rating)?;

        Ok(ValidDraft {
            user_id: self.user_id,
            author_name: self.author_name.filter(|n| !n.trim().is_empty()),
            hotel_id: self.hotel_id,
            rating,
            review_text: self.review_text,
        })
    }
}

/// A draft whose fields passed validation.
///
/// Carries the author's display name from the token so stores can keep
/// their user directory current.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub(crate) user_id: UserId,
    pub(crate) author_name: Option<String>,
    pub(crate) hotel_id: HotelId,
    pub(crate) rating: Rating,
    pub(crate) review_text: String,
}

/// Minimal author identity shown next to a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorProjection {
    /// Author id.
    pub id: UserId,
    /// Display name, when the user directory knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A review as presented on a hotel page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListing {
    /// Review id.
    pub id: ReviewId,
    /// Resolved author, serialized as `userId`.
    pub user_id: AuthorProjection,
    /// Reviewed hotel.
    pub hotel_id: HotelId,
    /// Star rating.
    pub rating: Rating,
    /// Free text.
    pub review_text: String,
    /// Moderation status.
    pub status: ReviewStatus,
    /// Moderator reply, never shown for pending reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ReviewListing {
    /// Project a review with its resolved author name.
    pub fn new(review: Review, username: Option<String>) -> Self {
        let response = if review.status.is_terminal() { review.response } else { None };
        Self {
            id: review.id,
            user_id: AuthorProjection {
                id: review.user_id,
                username,
            },
            hotel_id: review.hotel_id,
            rating: review.rating,
            review_text: review.review_text,
            status: review.status,
            response,
            created_at: review.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::types::claims::Claims;

    fn identity(user: &str) -> Identity {
        Identity::from_verified(Claims::new(UserId::new(user), 0, i64::MAX))
    }

    fn identity_named(user: &str, name: &str) -> Identity {
        Identity::from_verified(Claims::new(UserId::new(user), 0, i64::MAX).with_username(name))
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
        for value in 1..=5 {
            assert_eq!(Rating::new(value).unwrap().value() as i64, value);
        }
    }

    #[test]
    fn test_rating_error_names_field() {
        match Rating::new(9) {
            Err(ReviewError::Validation { field, .. }) => assert_eq!(field, "rating"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rating_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("3").is_ok());
        assert!(serde_json::from_str::<Rating>("7").is_err());
    }

    #[test]
    fn test_pending_transitions() {
        let pending = ReviewStatus::Pending;
        assert_eq!(pending.transition(ReviewStatus::Approved).unwrap(), ReviewStatus::Approved);
        assert_eq!(pending.transition(ReviewStatus::Rejected).unwrap(), ReviewStatus::Rejected);
        assert!(ReviewStatus::Pending.transition(ReviewStatus::Pending).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for from in [ReviewStatus::Approved, ReviewStatus::Rejected] {
            for to in [ReviewStatus::Pending, ReviewStatus::Approved, ReviewStatus::Rejected] {
                assert!(matches!(
                    from.transition(to),
                    Err(ReviewError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_moderate_failure_leaves_review_untouched() {
        let draft = ReviewDraft::from_identity(&identity("u1"), HotelId::new("h1"), 4, "ok");
        let mut review = Review::from_valid_draft(draft.validate().unwrap());
        review.moderate(ReviewStatus::Approved, Some("Thanks!".into())).unwrap();
        let before = review.clone();

        assert!(review.moderate(ReviewStatus::Rejected, None).is_err());
        assert_eq!(review, before);
    }

    #[test]
    fn test_draft_takes_user_from_identity() {
        let draft = ReviewDraft::from_identity(&identity("alice"), HotelId::new("h1"), 5, "");
        assert_eq!(draft.user_id().as_str(), "alice");
    }

    #[test]
    fn test_draft_requires_hotel() {
        let draft = ReviewDraft::from_identity(&identity("alice"), HotelId::new("  "), 5, "");
        match draft.validate() {
            Err(ReviewError::Validation { field, .. }) => assert_eq!(field, "hotelId"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_listing_hides_response_while_pending() {
        let draft = ReviewDraft::from_identity(&identity("u1"), HotelId::new("h1"), 4, "ok");
        let mut review = Review::from_valid_draft(draft.validate().unwrap());
        review.response = Some("leaked".into());

        let listing = ReviewListing::new(review, None);
        assert_eq!(listing.response, None);
    }

    #[test]
    fn test_draft_carries_token_username() {
        let identity = identity_named("u1", "alice");
        let valid = ReviewDraft::from_identity(&identity, HotelId::new("h1"), 3, "")
            .validate()
            .unwrap();
        assert_eq!(valid.author_name.as_deref(), Some("alice"));

        let identity = identity_named("u2", " ");
        let valid = ReviewDraft::from_identity(&identity, HotelId::new("h1"), 3, "")
            .validate()
            .unwrap();
        assert_eq!(valid.author_name, None);
    }

    #[test]
    fn test_listing_serializes_author_as_user_id() {
        let draft = ReviewDraft::from_identity(&identity("u1"), HotelId::new("h1"), 4, "ok");
        let review = Review::from_valid_draft(draft.validate().unwrap());

        let json = serde_json::to_value(ReviewListing::new(review, Some("alice".into()))).unwrap();
        assert_eq!(json["userId"]["id"], "u1");
        assert_eq!(json["userId"]["username"], "alice");
        assert!(json.get("user").is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ReviewStatus::Approved).unwrap(), "\"approved\"");
        assert_eq!(ReviewStatus::from_str("REJECTED"), Some(ReviewStatus::Rejected));
    }
}
