//! Domain state: installed/published registries, inventory, and the
//! install/uninstall/publish/unpublish/upgrade operations that mutate
//! them.

mod constants;
mod domain;
mod error;
mod finder;
mod legacy;

pub use constants::SSM_VERSION;
pub use domain::{Domain, Inventory, UpgradeComponents};
pub use error::Error;
pub use finder::{find_domains, is_domain, DomainFinder, FindEntry};
