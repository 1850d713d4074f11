// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod event_surface;
pub mod http_data_source;
pub mod ndjson_stream;
