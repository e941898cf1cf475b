//! `ssm uninstall`: remove an installed package from a domain.
//!
//! Grounded on `ssm_uninstall.py`.

use ssm_domain::Domain;
use ssm_types::split_pkg_ref;

use crate::cli::UninstallArgs;
use crate::error::Error;

pub fn run(args: UninstallArgs) -> Result<(), Error> {
    let (dompath, pkgname) = match &args.pkgref {
        Some(pkgref) => {
            let (dom, name, _platform) = split_pkg_ref(pkgref)?;
            (dom.into(), name)
        }
        None => {
            let dompath = args.dompath.clone().ok_or(Error::BadArguments)?;
            let pkgname = args.name.clone().ok_or(Error::BadArguments)?;
            (dompath, pkgname)
        }
    };

    let dom = Domain::new(&dompath);
    if !dom.exists() {
        return Err(Error::DomainNotFound(dompath));
    }
    let Some(pkg) = dom.get_installed_package(&pkgname) else {
        return Err(Error::PackageNotFound(pkgname));
    };

    let meta = dom.get_meta()?;
    if meta.version().is_none() {
        return Err(Error::LegacyDomain(dompath));
    }

    dom.uninstall(&pkg)?;
    Ok(())
}
