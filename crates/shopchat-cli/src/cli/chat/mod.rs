//! Interactive support chat in the terminal.
//!
//! Wires a [`ChatClient`](shopchat_core::chat::client::ChatClient) to a
//! readline prompt: incoming messages print above the prompt, slash commands
//! control the session. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
