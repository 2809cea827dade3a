//! Telegram bot that reports who is connected to a TeamSpeak server.

pub mod access;
pub mod commands;
pub mod config;
pub mod format;
pub mod live;
pub mod teamspeak;
pub mod telegram;
pub mod telegram_log;
