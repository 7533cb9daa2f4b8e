pub mod api;
pub mod auction;
pub mod bidding;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod message_broker;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod user;
