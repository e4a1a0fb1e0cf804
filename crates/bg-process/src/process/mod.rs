pub mod expiry;
pub mod outbox_gc;
