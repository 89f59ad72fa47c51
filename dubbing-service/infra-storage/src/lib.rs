mod fetcher;
mod object;

pub use fetcher::HttpMediaFetcher;
pub use object::{S3ObjectStore, S3Settings};
