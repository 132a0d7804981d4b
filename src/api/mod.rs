// API module
//
// HTTP surface of the wallet server

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
