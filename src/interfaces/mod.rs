pub mod report;

pub use report::{LogRenderer, Renderer, render_summary};
