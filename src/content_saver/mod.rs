//! Content saving utilities for the static mirror

// Module declarations
mod html_saver;
mod resource_saver;

// Re-export public API from html_saver module
pub use html_saver::save_html_content;

// Re-export public API from resource_saver module
pub use resource_saver::{save_resource, write_atomic};
