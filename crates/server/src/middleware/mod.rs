//! HTTP middleware and request extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting on `/send_mail` (governor)
//!
//! Authentication and page layout data are extractors rather than layers.

pub mod auth;
pub mod context;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    CartUser, OptionalUser, RequireAdmin, RequireUser, set_current_admin, set_current_user,
};
pub use context::{Flashes, NavUser, PageContext};
pub use flash::{OPERATION_FAILED, flash_failure, push_flash, take_flashes};
pub use rate_limit::mail_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, remember_session};
