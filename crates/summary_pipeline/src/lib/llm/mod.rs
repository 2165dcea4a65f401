pub mod openai;
pub mod prompt;
pub mod summarizer;
