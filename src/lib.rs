//! Booking Assist. Turns inbound customer messages into leads, bookings and replies.

pub mod business;
pub mod config;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod server;
