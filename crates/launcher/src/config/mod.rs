//! Launch inputs: staging metadata and platform options

mod platform_options;
mod staging_info;

pub use platform_options::*;
pub use staging_info::*;
