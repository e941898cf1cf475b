//! Build orchestration: load build specs, order them by dependency, and
//! turn each into a `.ssm` package file.

mod bcontrol;
mod builder;
mod error;

pub use bcontrol::{build_depmgr, load_build_specs, read_bcontrol, BuildSpec};
pub use builder::Builder;
pub use error::Error;
