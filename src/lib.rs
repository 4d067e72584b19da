pub mod admin;
pub mod auction;
pub mod bidding;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod fees;
pub mod handlers;
pub mod message_broker;
pub mod notify;
pub mod realtime;
pub mod routes;
pub mod session;
pub mod store;
pub mod timer;
