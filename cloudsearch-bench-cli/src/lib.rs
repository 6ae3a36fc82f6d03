#![doc = include_str!("../README.md")]

pub mod commands;
mod command_context;

pub use command_context::*;
