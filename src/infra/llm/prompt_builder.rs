use crate::domain::GenerationRequest;

const CREATE_SYSTEM_PROMPT: &str = "You are an expert game developer specializing in simple 2D games written in Python with Pygame.

When given a game description, generate complete, runnable Python code that:
1. Starts with all required imports (pygame, random, math as needed)
2. Initializes Pygame, the display window and a frame clock
3. Runs a proper game loop with event handling, updates and rendering every frame
4. Implements keyboard or mouse controls for the player
5. Implements the game mechanics: collision detection, scoring and win/lose conditions
6. Draws all graphics with Pygame primitives and renders score and status text

The program must be self-contained and must not require external assets.
Return only the Python source code.";

const UPDATE_SYSTEM_PROMPT: &str = "You are an expert game developer. You will be given existing Python/Pygame code and a request to modify it.

Your task is to:
1. Understand the existing code structure
2. Make the requested modifications
3. Keep the code functional and well-structured
4. Preserve the core game mechanics while implementing the changes
5. Return the complete updated program

Always return the full, updated code, not just the changes.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
}

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(request: &GenerationRequest) -> BuiltPrompt {
        match request.existing_code.as_deref() {
            Some(existing_code) => BuiltPrompt {
                system: UPDATE_SYSTEM_PROMPT.to_string(),
                user: format!(
                    "Here's the current game code:\n\n{existing_code}\n\nPlease modify it according to this request: {}",
                    request.prompt
                ),
            },
            None => BuiltPrompt {
                system: CREATE_SYSTEM_PROMPT.to_string(),
                user: format!(
                    "Create a 2D game based on this description: {}",
                    request.prompt
                ),
            },
        }
    }
}
