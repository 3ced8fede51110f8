//! LLM domain — AI text improvement.
//!
//! Client side (`improve.rs`) talks to the improve-text function; server side
//! (`openai.rs`) is the function's own call to the completion model. Prompt
//! constants are shared by both in `prompts.rs`.

mod improve;
pub mod openai;
pub mod prompts;

pub use improve::{ImproveError, ImprovementClient, TextImprover};
