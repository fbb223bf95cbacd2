//! Wire protocol for the relay broadcast server.
//!
//! This crate defines the multipart message unit exchanged between the
//! server and its subscribers, the fixed welcome and heartbeat markers,
//! and a codec for carrying messages over a byte stream.

#![warn(clippy::pedantic)]

pub mod codec;
pub mod message;
