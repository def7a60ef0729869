//! Advisory project detection
//!
//! Both detectors degrade to "unknown" on any failure; a bad guess only
//! affects which strategy succeeds first, never whether a deploy is attempted.

pub mod framework;
pub mod root_dir;

pub use framework::{classify_package_json, detect_framework};
pub use root_dir::{
    DEFAULT_SCAN_DEPTH, collect_package_dirs, rank_root_candidates, resolve_root_directories,
    score_root_candidate,
};
