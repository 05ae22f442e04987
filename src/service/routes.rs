//! Axum routes for the review service.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ReviewError;
use crate::review_service::{HotelReviews, SubmitReview};
use crate::store::ReviewStore;
use crate::types::{Hotel, HotelId, Review, ReviewListing};

use super::middleware::record_submission;
use super::state::ServiceState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Average rating of a hotel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageRatingResponse {
    /// Unrounded mean, `null` when the hotel has no reviews.
    pub average_rating: Option<f64>,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_secs: u64,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service can take traffic.
    pub ready: bool,
    /// Store reachable.
    pub store: bool,
    /// Signing secret configured.
    pub token_verification: bool,
    /// Why the service is not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Offending field for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            field: None,
            details: None,
        }
    }

    /// Name the offending field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A lifecycle error.
    Review(ReviewError),
    /// The request body was not valid JSON of the expected shape.
    InvalidBody {
        /// Top-level field the decoder stopped at, when it got that far.
        field: Option<String>,
        /// Decoder message.
        details: String,
    },
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        Self::Review(err)
    }
}

impl ApiError {
    /// Build an `InvalidBody` error from a JSON extractor rejection.
    pub fn from_json_rejection(rejection: &JsonRejection) -> Self {
        let details = rejection.body_text();
        Self::InvalidBody {
            field: body_error_field(&details),
            details,
        }
    }

    fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        match self {
            Self::InvalidBody { field, details } => {
                let message = "Request body is not a valid review submission.";
                let mut body =
                    ErrorResponse::new("INVALID_BODY", message).with_details(details.clone());
                if let Some(field) = field {
                    body = body.with_field(field.clone());
                }
                (StatusCode::BAD_REQUEST, body)
            }
            Self::Review(err) => {
                let code = err.code();
                match err {
                    ReviewError::MissingCredential => (
                        StatusCode::UNAUTHORIZED,
                        ErrorResponse::new(code, "Access denied. No token provided."),
                    ),
                    ReviewError::InvalidCredential(_) => {
                        (StatusCode::FORBIDDEN, ErrorResponse::new(code, "Invalid token."))
                    }
                    ReviewError::Validation { field, message } => {
                        let body = ErrorResponse::new(code, format!("{} {}", field, message));
                        (StatusCode::BAD_REQUEST, body.with_field(*field))
                    }
                    ReviewError::InvalidTransition { .. } => {
                        (StatusCode::CONFLICT, ErrorResponse::new(code, err.to_string()))
                    }
                    ReviewError::NotFound { .. } => {
                        (StatusCode::NOT_FOUND, ErrorResponse::new(code, err.to_string()))
                    }
                    ReviewError::Internal(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new(code, "Internal server error."),
                    ),
                }
            }
        }
    }
}

/// Top-level field named by a body decoding error.
///
/// Data errors read `... target type: <path>: <message>`; syntax errors and
/// errors at the document root carry no path.
fn body_error_field(text: &str) -> Option<String> {
    let (_, rest) = text.split_once("target type: ")?;
    let (path, _) = rest.split_once(": ")?;
    let field = path.split(['.', '[']).next()?;
    let is_identifier =
        !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_identifier.then(|| field.to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            tracing::error!(code = %body.code, error = ?self, "request failed");
        } else {
            tracing::warn!(code = %body.code, error = %body.error, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Average rating of a hotel.
async fn average_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
    Path(hotel_id): Path<String>,
) -> Result<Json<AverageRatingResponse>, ApiError> {
    let average_rating = state.reviews.average_rating(&HotelId::new(hotel_id)).await?;
    Ok(Json(AverageRatingResponse { average_rating }))
}

/// Reviews of a hotel in insertion order.
async fn list_reviews_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
    Path(hotel_id): Path<String>,
) -> Result<Json<Vec<ReviewListing>>, ApiError> {
    let reviews = state.reviews.list_reviews(&HotelId::new(hotel_id)).await?;
    Ok(Json(reviews))
}

/// Reviews and average in one response.
async fn summary_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
    Path(hotel_id): Path<String>,
) -> Result<Json<HotelReviews>, ApiError> {
    let detail = state.reviews.hotel_reviews(&HotelId::new(hotel_id)).await?;
    Ok(Json(detail))
}

/// Submit a review. Requires a bearer token.
///
/// The token is checked before the body, so an unauthenticated caller gets
/// 401/403 even when the body is malformed.
async fn submit_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
    headers: HeaderMap,
    body: Result<Json<SubmitReview>, JsonRejection>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let start = Instant::now();
    let result = match body {
        Ok(Json(request)) => state.reviews.submit(&headers, request).await.map_err(ApiError::from),
        Err(rejection) => match state.reviews.guard().authenticate(&headers) {
            Ok(_) => Err(ApiError::from_json_rejection(&rejection)),
            Err(e) => Err(ApiError::Review(e.into())),
        },
    };

    let outcome = match &result {
        Ok(_) => "created",
        Err(ApiError::InvalidBody { .. }) => "invalid_body",
        Err(ApiError::Review(e)) => e.code(),
    };
    record_submission(outcome, start.elapsed().as_millis() as u64);

    result.map(|review| (StatusCode::CREATED, Json(review)))
}

/// List hotels.
async fn list_hotels_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
) -> Result<Json<Vec<Hotel>>, ApiError> {
    Ok(Json(state.reviews.hotels().await?))
}

/// Get one hotel.
async fn get_hotel_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
    Path(hotel_id): Path<String>,
) -> Result<Json<Hotel>, ApiError> {
    Ok(Json(state.reviews.hotel(&HotelId::new(hotel_id)).await?))
}

/// Liveness probe endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store is reachable and a signing secret is configured,
/// 503 otherwise.
async fn readiness_handler<S: ReviewStore + 'static>(
    State(state): State<ServiceState<S>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let store = state.reviews.store().is_healthy().await;
    let token_verification = state.reviews.guard().verifier().is_enabled();

    if store && token_verification {
        Ok(Json(ReadinessResponse {
            ready: true,
            store,
            token_verification,
            details: None,
        }))
    } else {
        let details = if !store {
            "Review store unreachable"
        } else {
            "Signing secret not configured"
        };
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store,
                token_verification,
                details: Some(details.to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the review service.
pub fn create_router<S: ReviewStore + 'static>(state: ServiceState<S>) -> Router {
    Router::new()
        // Reviews
        .route("/api/reviews/submit", post(submit_handler::<S>))
        .route("/api/reviews/hotel/:hotel_id", get(list_reviews_handler::<S>))
        .route("/api/reviews/hotel/:hotel_id/average", get(average_handler::<S>))
        .route("/api/reviews/hotel/:hotel_id/summary", get(summary_handler::<S>))
        // Hotel catalog
        .route("/api/hotels", get(list_hotels_handler::<S>))
        .route("/api/hotels/:hotel_id", get(get_hotel_handler::<S>))
        // Health checks
        .route("/health/live", get(liveness_handler::<S>))
        .route("/health/ready", get(readiness_handler::<S>))
        .with_state(state)
}
