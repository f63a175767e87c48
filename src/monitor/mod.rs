//! Monitor-side modules: configuration, probing and the polling loop.
pub mod config;
pub mod connectivity;
pub mod encoding;
pub mod fetcher;
pub mod observation;
pub mod service;
pub mod shutdown;
pub mod transport;
