//! Test helpers for Brevo backend tests

pub mod mock_server;

pub use mock_server::MockBrevoServer;
