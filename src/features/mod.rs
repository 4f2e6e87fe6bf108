pub mod auth;
pub mod gallery;
pub mod generate;
pub mod health;
pub mod moderation;
pub mod storage;
