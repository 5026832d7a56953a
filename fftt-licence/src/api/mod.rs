//! HTTP API handlers for fftt-licence

pub mod buildinfo;
pub mod health;
pub mod licence;
pub mod ui;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use licence::get_licence;
pub use ui::{serve_app_js, serve_index};
