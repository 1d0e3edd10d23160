//! Listening socket and connection tasks.

pub mod listener;
