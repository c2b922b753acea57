// Shared prompt fragments.
// Each module that calls the model defines its own prompts.rs alongside it.

/// Instruction keeping generated text speakable by a voice agent.
pub const SPEAKABLE_INSTRUCTION: &str = "\
    The text will be read aloud by a voice assistant. \
    Do NOT use special characters like \"/\", \"*\", or any other non-speakable symbols.";
