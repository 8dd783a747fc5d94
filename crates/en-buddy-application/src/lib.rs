//! Application layer for En-Buddy.
//!
//! Use cases that coordinate the streaming assemblers, the REST backend
//! client and the local record store.

pub mod playground_usecase;
pub mod vocabulary_service;

pub use playground_usecase::{AnalyzeResult, PlaygroundUseCase};
pub use vocabulary_service::VocabularyService;
