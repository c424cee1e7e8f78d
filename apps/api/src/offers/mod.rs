pub mod handlers;
pub mod requirement;
pub mod store;
