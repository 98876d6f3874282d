pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod security;
pub mod types;
pub mod webhook;

pub use db::ExplDb;
pub use error::ExplError;
pub use security::TokenCodec;
