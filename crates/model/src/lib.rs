pub mod account;
pub mod decimal;
pub mod notification;
pub mod payment;
pub mod period;
pub mod session;
pub mod sweep;
pub mod vote;
