pub mod accounts;
pub mod billing;
pub mod moderation;
pub mod outbox;
