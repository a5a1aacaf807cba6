//! Answer generator implementations

mod extractive;
mod llm;

pub use extractive::{ExtractiveAnswerGenerator, NO_CONTEXT_ANSWER};
pub use llm::LlmAnswerGenerator;
