pub mod auth;
pub mod csrf;
pub mod group;
pub mod role;
pub mod upload;
pub mod user;
