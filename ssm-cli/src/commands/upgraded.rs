//! `ssm upgraded`: upgrade a legacy (v7-v10) domain to the current
//! metadata and registry layout.
//!
//! Grounded on `ssm_upgraded.py`.

use ssm_domain::{Domain, UpgradeComponents};

use crate::cli::UpgradedArgs;
use crate::error::Error;

pub fn run(args: UpgradedArgs) -> Result<(), Error> {
    let dom = Domain::new(&args.dompath);
    if !dom.exists() {
        return Err(Error::DomainNotFound(args.dompath.clone()));
    }

    if !args.legacy && !dom.is_legacy()? {
        return Err(Error::OperationFailed("domain is already current".to_string()));
    }

    let components = match &args.components {
        Some(spec) => UpgradeComponents::parse(spec),
        None => UpgradeComponents::all(),
    };

    dom.upgrade(&components)?;
    Ok(())
}
