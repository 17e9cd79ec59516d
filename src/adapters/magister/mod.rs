//! Magister adapters: REST API gateway and HTTP login.

pub mod auth_adapter;
pub mod authcode;
pub mod client;
pub mod oauth;

pub use auth_adapter::HttpAuthAdapter;
pub use client::MagisterClient;
