//! API layer - HTTP endpoints and middleware

pub mod health;
pub mod middleware;
pub mod pipelines;
pub mod router;
pub mod state;
pub mod types;

pub use router::create_router_with_state;
pub use state::AppState;
