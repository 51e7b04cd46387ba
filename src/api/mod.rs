//! HTTP API module: the informational endpoints and their middleware.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::AppState;
pub use middleware::JsonBody;
pub use routes::{create_router, with_middleware};
