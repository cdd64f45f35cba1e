pub mod auth;
pub mod group;
pub mod profile;
pub mod role;
pub mod shared;
pub mod upload;
pub mod user;
