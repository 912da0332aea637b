//! Remote download infrastructure module

mod http;

pub use http::HttpDownloader;
