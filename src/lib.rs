//! # agelab
//!
//! Encrypt messages to GitLab users with the SSH keys they already publish, and
//! decrypt them with a local private key. Envelopes are ASCII-armored age files.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod keys;
pub mod pipeline;
pub mod ui;
