//! Network-facing side of the En-Buddy client: the event-stream pipeline,
//! the chat and coach assemblers built on it, and the REST backend client.

pub mod backend;
pub mod chat;
pub mod coach;
pub mod decoder;
pub mod extractor;
pub mod stream_client;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use crate::backend::BackendClient;
pub use crate::chat::{ChatOutcome, ChatState, MessageAssembler};
pub use crate::coach::{AnalysisAssembler, AnalysisSnapshot, AnalysisState};
pub use crate::decoder::LineBufferedDecoder;
pub use crate::extractor::{EventExtractor, PayloadSemantics};
pub use crate::stream_client::{ErrorBodyPolicy, StreamClient, StreamOutcome, TransportProfile};
pub use crate::transport::{ByteStream, EventTransport, HttpTransport, StreamResponse};
