// Application layer - Use cases and ports
pub mod chart_registry;
pub mod chart_surface;
pub mod dashboard_service;
pub mod data_source;
pub mod error;
#[cfg(test)]
pub mod fake_source;
pub mod initial_load;
pub mod live_append;
pub mod request_tracker;
pub mod style_registry;
pub mod view_service;
pub mod view_session;
