//! Email delivery infrastructure

mod config;
mod http_transport;
mod log_transport;
mod sender;

pub use config::{MailConfig, MailTransportKind};
pub use http_transport::HttpMailTransport;
pub use log_transport::LogMailTransport;
pub use sender::NotificationSender;
