pub mod account;
pub mod connection;
pub mod migration;
pub mod swap;
pub mod transaction;
