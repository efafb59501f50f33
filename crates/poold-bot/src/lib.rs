// ABOUTME: Command handlers and the chat platform REST client for poold.
// ABOUTME: Translates ledger outcomes into user-facing replies and announcements.

pub mod commands;
pub mod discord;

pub use commands::{BorrowStart, CommandReply, PurgeReport};
pub use discord::{ChannelMessage, ChatError, DiscordRest};
