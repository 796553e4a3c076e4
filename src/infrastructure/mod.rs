//! Infrastructure layer - External service implementations

pub mod avatar;
pub mod directory;
pub mod event;
pub mod logging;
pub mod notification;
pub mod observability;
pub mod retry;
pub mod services;
pub mod storage;
pub mod user;
