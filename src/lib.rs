pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod identity;
pub mod memory;
pub mod state;

pub use app::build_app;
pub use state::AppState;
