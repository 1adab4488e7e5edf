pub mod api_connection;
pub mod cli;
pub mod config;
pub mod location;
pub mod model;
pub mod prompt_builder;
pub mod session;
pub mod terminal;
