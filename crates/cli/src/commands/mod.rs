pub mod chat;
pub mod check;
pub mod config_cmd;
pub mod gateway;
pub mod onboard;
