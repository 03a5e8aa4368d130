//! Types shared between the invitation server and anything that talks to it.

pub mod accounts;
pub mod api;
pub mod config;
pub mod events;
pub mod gallery;
pub mod models;
