pub mod api;
pub mod client;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod server;
pub mod settings;
