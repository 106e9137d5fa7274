//! Cover-letter generator implementations.

pub mod openai;
pub mod prompt;

pub use openai::OpenAiGenerator;
pub use prompt::format_cover_letter_prompt;
