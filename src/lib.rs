pub mod aggregate;
pub mod db;
pub mod ingest;
pub mod reddit;
pub mod registry;
pub mod schema;
pub mod scoring;
pub mod settings;
pub mod tickers;
pub mod utils;
