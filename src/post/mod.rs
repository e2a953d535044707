mod draft;
pub mod formatter;

pub use draft::{DraftError, PostDraft};
pub use formatter::{render_filename, render_markdown};
