//! `ssm unpublish`: remove a published package and everything that
//! depends on it.
//!
//! Grounded on `ssm_unpublish.py`.

use ssm_common::platform_env::determine_platform_configured;
use ssm_domain::Domain;
use ssm_types::{split_pkg_ref, PackageName};

use super::confirm;
use crate::cli::UnpublishArgs;
use crate::config::Config;
use crate::error::Error;

pub fn run(args: UnpublishArgs, config: &Config) -> Result<(), Error> {
    let dom;
    let dompath;
    let pkgname;
    let pubplatform;

    if let Some(pkgref) = &args.pkgref {
        let (dp, name, platform) = split_pkg_ref(pkgref)?;
        dompath = dp.into();
        dom = Domain::new(&dompath);
        if !dom.exists() {
            return Err(Error::DomainNotFound(dompath));
        }
        let pkg = dom
            .get_published_package_short(&name, Some(&platform))?
            .ok_or_else(|| Error::PackageNotFound(name.clone()))?;
        pkgname = pkg.name;
        pubplatform = platform;
    } else {
        dompath = args.dompath.clone().ok_or(Error::BadArguments)?;
        pkgname = args.name.clone().ok_or(Error::BadArguments)?;
        dom = Domain::new(&dompath);
        if !dom.exists() {
            return Err(Error::DomainNotFound(dompath));
        }
        pubplatform = match &args.pubplatform {
            Some(p) => p.clone(),
            None => {
                let parsed_platform = pkgname
                    .parse::<PackageName>()
                    .ok()
                    .map(|name| name.platform().as_str().to_string());
                determine_platform_configured(parsed_platform.as_deref(), &config.disabled_publish_platforms)
                    .ok_or(Error::BadArguments)?
            }
        };
    }

    if dom.get_meta()?.version().is_none() {
        return Err(Error::LegacyDomain(dompath));
    }

    let pkg = dom
        .get_published_package(&pkgname, Some(&pubplatform))
        .ok_or_else(|| Error::PackageNotFound(pkgname.clone()))?;

    let deppkgs = dom.get_dependents(&pkg, &pubplatform)?;
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
        dom.unpublish(deppkg, &pubplatform, args.common.force)?;
    }
    Ok(())
}
