pub mod analyze;
pub mod chat;
pub mod conversations;
pub mod history;
pub mod translate;
pub mod vocab;

mod input;
