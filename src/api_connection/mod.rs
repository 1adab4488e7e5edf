pub mod connection;
pub mod endpoints;

pub use connection::{strip_wrapping_quotes, CompletionError, CompletionGateway, CompletionService, GatewaySettings};
