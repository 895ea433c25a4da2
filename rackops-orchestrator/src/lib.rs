//! Provisioning workflows over the provider traits in `rackops-providers`.

pub mod config;
pub mod console;
pub mod poller;
pub mod upload;
pub mod workflows;

pub use config::{connect, Credentials, PollIntervals, ProviderKind};
pub use console::Console;
pub use workflows::{Outcome, Session};
