//! Domain services used by HTTP routes and background workers.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod achievement;
pub mod analytics;
pub mod board;
pub mod category;
pub mod email_auth;
pub mod family;
pub mod notification;
pub mod reminder;
pub mod search;
pub mod session;
pub mod tag;
pub mod task;
