//! Subsystem modules for the campus bot.

pub mod comms;
