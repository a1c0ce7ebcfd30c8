pub mod client;
pub mod error;

pub use client::GeoIpClient;
pub use error::Error;
