pub mod api_client;
pub mod classic;
pub mod config;
pub mod ui;
pub mod utils;
