pub mod auth;
pub mod contact;
