pub mod casemap;
pub mod channels;
pub mod config;
pub mod constants;
pub mod errors;
pub mod handlers;
pub mod message;
pub mod parsers;
pub mod replies;
pub mod server;
pub mod server_state;
pub mod types;
pub mod users;
