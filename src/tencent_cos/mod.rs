pub mod cos_client;

pub use cos_client::{CosConfig, CosS3Client};
