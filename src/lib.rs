// Library root: review pipeline modules plus the HTTP layer

pub mod config;
pub mod reviews;
pub mod server;
