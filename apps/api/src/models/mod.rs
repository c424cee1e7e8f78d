pub mod matching;
pub mod message;
pub mod notification;
pub mod offer;
pub mod talent;
pub mod user;
