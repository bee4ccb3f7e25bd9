//! Bank connections API and related entities.

mod api;
mod model;

pub use api::ConnectionsApi;
pub use model::*;
