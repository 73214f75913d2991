//! NAMUR CLI Library
//!
//! Argument parsing, settings resolution and command handlers for the
//! `namurctl` tool. Device access goes through
//! [`namur_hardware::HeaterStirrer`].

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Serial settings resolution (defaults, file, environment, arguments).
pub mod config;
