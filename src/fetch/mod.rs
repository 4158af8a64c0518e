pub mod cds_client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod retriever;
