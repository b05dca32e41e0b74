pub mod checkout;
pub mod push;
