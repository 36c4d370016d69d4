pub mod llm_engine;
pub mod util;

pub use llm_engine::{InferenceError, InferenceResult, OllamaEngine, RetryPolicy, TransportKind};
