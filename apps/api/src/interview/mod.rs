pub mod answer_source;
pub mod difficulty;
pub mod evaluator;
pub mod events;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod question_generator;
pub mod registry;
pub mod session;
pub mod speech;
pub mod summary;
