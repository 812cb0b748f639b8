mod error;
mod handlers;
mod params;
mod router;
mod types;

pub use handlers::core::select_workspace;
pub use router::{handle_request, handle_tick};
pub use types::{AppState, Request};
