//! Vellum CMS Kernel Library
//!
//! Filter-to-SQL compilation, template rendering and the small utilities
//! list endpoints lean on (escaping, request-rate tracking, caching).
//! The command-line entry point is the `vellum` binary.

pub mod cache;
pub mod config;
pub mod db;
pub mod metrics;
pub mod query;
pub mod sanitize;
pub mod template;
pub mod value;

pub use config::Config;
pub use query::{QueryFilter, QueryFilterBuilder, QueryResult, build_query};
pub use template::{TemplateRenderer, render_template};
