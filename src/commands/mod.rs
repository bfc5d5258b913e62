pub mod dashboard;
pub mod details;
pub mod favorites;
pub mod health;
pub mod live_stream;
pub mod notifications;
