//! `ssm publish`: publish an installed package under its short name.
//!
//! Grounded on `ssm_publish.py`.

use ssm_common::platform_env::determine_platform_configured;
use ssm_domain::Domain;
use ssm_types::split_pkg_ref;

use super::confirm;
use crate::cli::PublishArgs;
use crate::config::Config;
use crate::error::Error;

pub fn run(args: PublishArgs, config: &Config) -> Result<(), Error> {
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
    let pubdompath = args.pubdompath.clone().unwrap_or_else(|| dompath.clone());

    let dom = Domain::new(&dompath);
    let pubdom = Domain::new(&pubdompath);
    if !dom.exists() {
        return Err(Error::DomainNotFound(dompath));
    }
    if !pubdom.exists() {
        return Err(Error::DomainNotFound(pubdompath));
    }
    if dom.get_meta()?.version().is_none() {
        return Err(Error::LegacyDomain(dompath));
    }
    if pubdom.get_meta()?.version().is_none() {
        return Err(Error::LegacyDomain(pubdompath));
    }

    let pkg = dom
        .get_installed_package(&pkgname)
        .ok_or(Error::PackageNotFound(pkgname))?;

    let pubplatform = args
        .pubplatform
        .clone()
        .or_else(|| determine_platform_configured(pkg.platform.as_deref(), &config.disabled_publish_platforms))
        .ok_or(Error::BadArguments)?;

    let short_name = pkg.short.clone().ok_or(Error::BadArguments)?;
    if let Some(pubpkg) = pubdom.get_published_package_short(&short_name, Some(&pubplatform))? {
        let deppkgs = pubdom.get_dependents(&pubpkg, &pubplatform)?;
        if deppkgs.len() > 1 && !args.common.force {
            let names: Vec<&str> = deppkgs.iter().map(|p| p.name.as_str()).collect();
            let prompt = format!(
                "found dependent packages: {}\nunpublish all (y/n)? ",
                names.join(", ")
            );
            if !confirm(&prompt) {
                return Ok(());
            }
        }
        for deppkg in &deppkgs {
            pubdom.unpublish(deppkg, &pubplatform, true)?;
        }
    }

    pubdom.prepublish(&pkg, &pubplatform)?;
    pubdom.publish(&pkg, &pubplatform, args.common.force)?;
    Ok(())
}
