//! Persisted job-submission templates.
//!
//! Each template is a flat key-value parameter map stored as one JSON
//! file per name. Names are validated before ever touching the file
//! system, so a template name can never escape the store directory.

pub mod defaults;
pub mod store;

pub use defaults::default_templates;
pub use store::{TemplateError, TemplateStore};
