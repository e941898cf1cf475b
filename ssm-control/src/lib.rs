//! Package and domain control metadata.
//!
//! Handles both the current JSON control format (`.ssm.d/control.json`,
//! `etc/ssm.d/meta.json`) and the legacy colon-separated control format
//! used by pre-upgrade packages.

mod control;
mod error;

pub use control::Control;
pub use error::Error;
