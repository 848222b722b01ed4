use crate::domain::Archetype;

const SPACE_SHOOTER_KEYWORDS: &[&str] = &["space", "shooter", "alien", "spaceship", "asteroid"];
const PLATFORMER_KEYWORDS: &[&str] = &["platform", "jump", "mario", "runner"];
const PUZZLE_KEYWORDS: &[&str] = &["puzzle", "match", "connect", "block"];
const RACING_KEYWORDS: &[&str] = &["racing", "car", "drive", "speed"];

/// Keyword tables in precedence order. The first table with a hit wins.
const RULES: [(Archetype, &[&str]); 4] = [
    (Archetype::SpaceShooter, SPACE_SHOOTER_KEYWORDS),
    (Archetype::Platformer, PLATFORMER_KEYWORDS),
    (Archetype::Puzzle, PUZZLE_KEYWORDS),
    (Archetype::Racing, RACING_KEYWORDS),
];

/// Picks an archetype from case-insensitive substring matches, defaulting
/// to [`Archetype::Adventure`].
pub fn classify(prompt: &str) -> Archetype {
    let lowered = prompt.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(archetype, _)| *archetype)
        .unwrap_or(Archetype::Adventure)
}
