//! Hosting panel management API client
//!
//! This crate provides the structured request/response channel to a hosting
//! control panel: a thin JSON envelope over HTTP for the management API, and
//! a local command path for the panel's own administration tools. The
//! deployment logic lives in `pd-deploy`; everything here is transport.

mod client;
pub mod types;

pub use client::{HttpPanelClient, PanelClient};
pub use types::{
    CommandOutput, PanelError, PanelRequest, PanelResponse, PanelResult, PoolEntry, ResponseStatus,
};
