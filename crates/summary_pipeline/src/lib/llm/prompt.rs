pub const SYSTEM_PROMPT: &str = include_str!("./prompts/system_0.txt");

/// Used when the submission carries no instruction of its own
pub const DEFAULT_INSTRUCTION: &str = include_str!("./prompts/default_instruction.txt");

/// Builds the user message sent alongside [`SYSTEM_PROMPT`]
pub fn build_user_prompt(text: &str, instruction: Option<&str>) -> String {
    let instruction = instruction
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| DEFAULT_INSTRUCTION.trim());

    format!("{instruction}\n\nText to summarize:\n{text}")
}
