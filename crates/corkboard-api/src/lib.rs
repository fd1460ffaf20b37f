pub mod auth;
pub mod avatar;
pub mod contacts;
pub mod error;
pub mod pages;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;
pub mod users;
