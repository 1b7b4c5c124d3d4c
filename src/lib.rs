//! Room-based WebSocket chat server library.
//!
//! This library provides a chat server that groups WebSocket connections
//! into named rooms, tracks per-room presence, broadcasts chat events to
//! room members and evicts dead connections via periodic heartbeats.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// shared library
pub mod common;
