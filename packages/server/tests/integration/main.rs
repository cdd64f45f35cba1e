mod auth;
mod common;
mod group;
mod role;
mod upload;
