pub mod criteria;
pub mod engine;
pub mod handlers;
pub mod levels;
pub mod recommendations;
pub mod scorer;
pub mod store;
pub mod types;
pub mod weights;
