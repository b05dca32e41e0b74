pub mod booking;
pub mod chat;
pub mod handover;
pub mod location;
pub mod notification;
pub mod payment;
pub mod ride_history;
pub mod user;
pub mod vehicle;
