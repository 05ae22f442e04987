//! Review REST Service
//!
//! ## Endpoints
//!
//! - `GET /api/reviews/hotel/:hotel_id` - Reviews of a hotel
//! - `GET /api/reviews/hotel/:hotel_id/average` - Average rating of a hotel
//! - `GET /api/reviews/hotel/:hotel_id/summary` - Reviews and average together
//! - `POST /api/reviews/submit` - Submit a review (bearer token required)
//! - `GET /api/hotels` - List hotels
//! - `GET /api/hotels/:hotel_id` - Get one hotel
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{
    metrics_middleware, record_submission, request_id, request_logging_middleware,
    REQUEST_ID_HEADER,
};
pub use routes::{create_router, ApiError, ErrorResponse};
pub use state::ServiceState;
