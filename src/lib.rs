//! # Survey Bot
//!
//! A Telegram bot that distributes scheduled surveys to registered users,
//! tracks who has answered, and compiles answer statistics.
//!
//! ## Features
//! - Multi-step wizard for drafting questions (choice or free-text)
//! - Targeting by role, by user, or broadcast to everyone
//! - Polling delivery loop with crash-safe, resumable progress
//! - Per-recipient reminder nags with a give-up ceiling
//! - Persistent storage with SQLite

/// Command handlers, the draft wizard, and message routing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and the repository
pub mod database;
/// Error taxonomy shared across the engine
pub mod error;
/// Chat transport abstraction and the Telegram implementation
pub mod messenger;
/// Background services: delivery loop, answer collection, statistics
pub mod services;
/// Utility functions for datetime parsing and formatting
pub mod utils;
