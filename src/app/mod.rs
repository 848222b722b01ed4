mod generation_service;

pub use generation_service::{GenerationService, annotate_failed_update};
