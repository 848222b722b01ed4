use log::debug;
use tera::{Context, Tera};

use crate::domain::{Archetype, LlmError};

use super::classify;

pub const TITLE_MAX_CHARS: usize = 50;
pub const PLACEHOLDER_TITLE: &str = "Custom Game";

const TEMPLATE_SOURCES: [(Archetype, &str); 5] = [
    (
        Archetype::SpaceShooter,
        include_str!("../../../templates/space_shooter.py.tera"),
    ),
    (
        Archetype::Platformer,
        include_str!("../../../templates/platformer.py.tera"),
    ),
    (
        Archetype::Puzzle,
        include_str!("../../../templates/puzzle.py.tera"),
    ),
    (
        Archetype::Racing,
        include_str!("../../../templates/racing.py.tera"),
    ),
    (
        Archetype::Adventure,
        include_str!("../../../templates/adventure.py.tera"),
    ),
];

/// Offline generator: one fixed pygame program per archetype, with only the
/// window caption varying by prompt.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    pub fn new() -> Result<Self, LlmError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(
            TEMPLATE_SOURCES
                .iter()
                .map(|(archetype, source)| (template_name(*archetype), *source)),
        )
        .map_err(|error| LlmError::template(format!("failed to compile game templates: {error}")))?;

        Ok(Self { tera })
    }

    pub fn render(&self, prompt: &str) -> Result<String, LlmError> {
        self.render_archetype(classify(prompt), prompt)
    }

    pub fn render_archetype(&self, archetype: Archetype, prompt: &str) -> Result<String, LlmError> {
        let mut context = Context::new();
        context.insert("title", &escape_python_string(&display_title(prompt)));

        let source = self
            .tera
            .render(&template_name(archetype), &context)
            .map_err(|error| {
                LlmError::template(format!("failed to render {archetype} template: {error}"))
            })?;
        debug!("rendered {archetype} template ({} bytes)", source.len());
        Ok(source)
    }
}

fn template_name(archetype: Archetype) -> String {
    format!("{}.py", archetype.name())
}

/// Caption text for a prompt: the first 50 characters, or the placeholder
/// when the prompt is blank.
pub fn display_title(prompt: &str) -> String {
    if prompt.trim().is_empty() {
        return PLACEHOLDER_TITLE.to_string();
    }
    prompt.chars().take(TITLE_MAX_CHARS).collect()
}

/// Escapes text for the inside of a double-quoted Python string literal.
fn escape_python_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            ch if (ch as u32) < 0x20 || ch == '\u{7f}' => {
                escaped.push_str(&format!("\\x{:02x}", ch as u32));
            }
            ch => escaped.push(ch),
        }
    }
    escaped
}
