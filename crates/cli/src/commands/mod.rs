pub mod error;
pub mod init;
pub mod start;
pub mod wallets;
