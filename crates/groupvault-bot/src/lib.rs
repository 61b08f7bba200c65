//! groupvault bot daemon.
//!
//! Wires the domain model and the Google provider into a Telegram bot:
//!
//! - [`config`] / [`cli`] - daemon configuration
//! - [`state`] - the persisted group/user state document
//! - [`session`] / [`auth`] - device-flow link orchestration
//! - [`provision`] - idempotent Drive structure provisioning
//! - [`dispatch`] - message classification and archive transfer
//! - [`telegram`] / [`commands`] / [`bot`] - the Telegram surface

pub mod auth;
pub mod bot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod provision;
pub mod replies;
pub mod session;
pub mod state;
pub mod telegram;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{BotError, BotResult};
