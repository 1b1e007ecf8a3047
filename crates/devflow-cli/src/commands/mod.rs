pub mod config;
pub mod init;
pub mod migrate;
pub mod utils;
