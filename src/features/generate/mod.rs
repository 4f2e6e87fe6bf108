pub mod client;
pub mod handler;
pub mod keys;
pub mod models;
pub mod validate;

pub use client::GenerationClient;
pub use handler::create_generate_router;
