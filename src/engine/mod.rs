pub mod accounts;
pub mod booking;
pub mod chat;
pub mod completion;
pub mod dispatcher;
pub mod events;
pub mod handover;
pub mod notifier;
pub mod otp;
pub mod payments;
pub mod tracking;
