pub mod group;
pub mod role;
pub mod upload;
pub mod user;
pub mod user_group_link;
pub mod user_profile;
