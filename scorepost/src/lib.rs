pub mod controller;
pub mod ingest;

pub use controller::Scorepost;
