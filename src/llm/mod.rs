//! LLM provider integrations and the answer panel

mod panel;
mod provider;

pub use panel::*;
pub use provider::*;
