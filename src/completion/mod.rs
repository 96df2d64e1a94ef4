//! Completion client - asks a chat model to write a test for one function.
//!
//! The pipeline only depends on the [`CompletionClient`] trait; the HTTP
//! implementation for OpenAI-compatible endpoints lives in `internal`.
//!
//! ```ignore
//! use go_testgen::completion::{build_prompt, CompletionClient, OpenAiClient};
//!
//! let client = OpenAiClient::new(api_key, &config)?;
//! let reply = client.complete(&build_prompt("Sum", "mathx", code))?;
//! ```

mod internal;

use anyhow::Result;

pub use internal::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, OpenAiClient, ResponseMessage, ROLE_USER,
};

/// Fixed instruction placed ahead of the function details in every prompt.
pub const INSTRUCTION: &str = "Your task is to generate a runnable test case code for the provided code. \
Please ensure that the test case covers all possible scenarios and edge cases, and that the code is \
easy to read and understand. Your response should only include the runnable code. Do not return any \
original code. Additionally, please make sure that the test case is well-organized and follows best \
practices for testing.";

/// A text-completion backend
pub trait CompletionClient {
    /// Send one prompt, return the model's free-text reply.
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<C: CompletionClient + ?Sized> CompletionClient for &C {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

impl<C: CompletionClient + ?Sized> CompletionClient for Box<C> {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

/// Format the user prompt for a single function.
pub fn build_prompt(function_name: &str, package_name: &str, function_code: &str) -> String {
    format!(
        "{INSTRUCTION}\n\nfunction named: {function_name}\npackage name: {package_name}\nfunction code:\n```go\n{function_code}\n```\n"
    )
}
