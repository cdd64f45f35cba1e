pub mod hash;
pub mod htmx;
pub mod jwt;
pub mod membership;
pub mod profile;
