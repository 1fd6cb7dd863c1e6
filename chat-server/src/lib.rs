//! Line-based chat server with a single shared room.
//!
//! Clients connect over TCP, pick a nickname and exchange public, private and
//! delayed messages. Abuse is kept in check with complaint-based bans and a
//! per-hour message limit. Each module focuses on one responsibility:
//!
//! - [`room`] accepts connections, runs each client's read loop and owns the
//!   single disconnect path.
//! - [`registry`] keeps the live sessions behind one lock and fans messages
//!   out to them.
//! - [`dispatch`] runs the handler for each line a client sends, using
//!   [`command`] to parse it.
//! - [`moderation`] decides whether a chat message is allowed.
//! - [`scheduler`] broadcasts delayed messages once their time comes.
//! - [`message`] renders server output and frames lines on the wire.
//! - [`server`], [`cli`] and [`config`] wire it all to a TCP listener.
//!
//! Integration tests drive a [`room::Room`] over in-memory streams as well as
//! real sockets.

pub mod cli;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod message;
pub mod moderation;
pub mod registry;
pub mod room;
pub mod scheduler;
pub mod server;
pub mod session;
