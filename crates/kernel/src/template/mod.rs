//! Logic-light template rendering.
//!
//! Supports `{{#each}}` iteration, `{{#if}}` conditionals, unescaped
//! `{{path}}` / `{{{path}}}` interpolation and the `titleCase` helper.
//! Rendering never fails: anything that cannot be resolved renders empty.

mod renderer;
mod scope;

pub use renderer::{MAX_IF_PASSES, TemplateRenderer, render_template};
