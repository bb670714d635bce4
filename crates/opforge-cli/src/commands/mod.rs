//! CLI commands

pub mod init_config;
pub mod inspect;
