pub mod completion;
pub mod config;
pub mod extract;
pub mod generate;
pub mod sanitize;
pub mod scanner;
pub mod writer;

// Re-export commonly used types
pub use completion::{CompletionClient, OpenAiClient};
pub use config::Config;
pub use generate::{Options, RunSummary};
