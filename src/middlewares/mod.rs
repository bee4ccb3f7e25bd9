pub mod auth_headers;
pub mod error_handling;
