//! mathquiz-report — HTML page rendering.
//!
//! Pages are plain strings with all CSS inlined; no template engine.

pub mod html;

pub use html::{
    render_index, render_not_found, render_results, render_test, write_html_report, IndexPage,
};
