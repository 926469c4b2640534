mod server;

pub use server::{BillingConfig, CoachConfig, ServerConfig};
