//! Dap package format: names, versions, archive metadata and tags.

pub mod archive;
pub mod names;
pub mod tags;
pub mod version;

pub use archive::{DapMeta, read_dap};
pub use names::is_valid_package_name;
pub use tags::{join_tags, parse_tags, slugify, suffixed_slug};
pub use version::Version;
