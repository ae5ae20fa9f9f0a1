pub mod model;
pub mod openai;

pub use model::{CompletionClient, Message, MessageRole};
pub use openai::OpenAiClient;
