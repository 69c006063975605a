//! Subcommand implementations.

pub mod decrypt;
pub mod encrypt;
pub mod gen_key;
pub mod listen;
pub mod login;
