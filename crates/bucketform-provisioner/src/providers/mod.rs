pub mod memory;
pub mod s3;

pub use memory::{Fault, MemoryProvider, ProviderCall};
pub use s3::S3Provider;
