pub mod blob;
pub mod cache;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod db;
pub mod descriptor;
pub mod error;
pub mod extractor;
pub mod lister;
pub mod metrics;
pub mod resolver;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use error::{FaceError, Result};
pub use lister::{GalleryEntry, GalleryLister};
pub use resolver::IdentityResolver;
pub use store::GalleryStore;
