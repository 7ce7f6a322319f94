pub mod ask_agent;

pub use ask_agent::{AskAgent, AskRequest, AskResponse};
