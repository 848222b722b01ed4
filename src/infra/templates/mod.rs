mod classifier;
mod generator;

pub use classifier::classify;
pub use generator::{PLACEHOLDER_TITLE, TITLE_MAX_CHARS, TemplateGenerator, display_title};
