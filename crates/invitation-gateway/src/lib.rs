//! Live guestbook feed: fan-out of new entries to WebSocket subscribers.

pub mod connection;
pub mod dispatcher;
