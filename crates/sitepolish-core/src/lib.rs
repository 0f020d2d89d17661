//! sitepolish Core Library
//!
//! Configuration, error handling, page descriptors and file-tree discovery
//! shared by the sitepolish rewrite passes and CLI.

pub mod config;
pub mod discovery;
pub mod error;
pub mod page;

pub use config::{ChangeFreq, Config, GalleryPage};
pub use discovery::{SiteScanner, SiteTree};
pub use error::{CoreError, Result};
pub use page::PageDescriptor;
