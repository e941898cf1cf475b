//! `ssm build`: resolve a dependency-ordered build list from a directory
//! of `.bssm` build specs and produce each missing package, optionally
//! installing and publishing it.
//!
//! Grounded on `ssm_build.py`/`ssm/builder.py`.

use std::path::PathBuf;

use ssm_build::{build_depmgr, load_build_specs, Builder};
use ssm_domain::Domain;
use ssm_package::{Package, PackageFile};
use ssm_repo::RepositoryGroup;

use crate::cli::BuildArgs;
use crate::error::Error;

fn find_installed_by_short(dom: &Domain, platform: &str, short: &str) -> Result<Option<Package>, Error> {
    let platforms = [platform.to_string()];
    Ok(dom
        .get_installed_packages(Some(&platforms))?
        .into_iter()
        .find(|pkg| pkg.short.as_deref() == Some(short)))
}

pub fn run(args: BuildArgs) -> Result<(), Error> {
    let dom = Domain::new(&args.dompath);
    if !dom.exists() {
        return Err(Error::DomainNotFound(args.dompath.clone()));
    }
    if dom.get_meta()?.version().is_none() {
        return Err(Error::LegacyDomain(args.dompath.clone()));
    }

    let specs = load_build_specs(&args.bssmdir)?;
    let depmgr = build_depmgr(&specs)?;
    let order = depmgr.generate(&args.pkgnames)?;

    if args.show_all {
        for name in &order {
            println!("{name}");
        }
        return Ok(());
    }

    let repo = match &args.repo {
        Some(url) => RepositoryGroup::from_urls([url.clone()]),
        None => dom.get_repository()?.unwrap_or_default(),
    };

    let mut missing = Vec::new();
    for name in &order {
        if dom.get_published_package_short(name, Some(&args.platform))?.is_some() {
            continue;
        }
        if find_installed_by_short(&dom, &args.platform, name)?.is_some() {
            continue;
        }
        missing.push(name.clone());
    }

    if args.show_missing {
        for name in &missing {
            println!("{name}");
        }
        return Ok(());
    }

    if args.dry {
        return Ok(());
    }

    let workdir = match &args.workdir {
        Some(workdir) => workdir.clone(),
        None => std::env::current_dir().map_err(|source| Error::Io {
            path: PathBuf::from("."),
            source,
        })?,
    };

    for name in &missing {
        let spec = specs
            .iter()
            .find(|spec| spec.bcontrol.name() == Some(name.as_str()))
            .ok_or_else(|| Error::OperationFailed(format!("no build spec found for {name}")))?;

        let builder = Builder::new(
            &workdir,
            &spec.path,
            Some(args.sourcesurl.clone()),
            &args.dompath,
            repo.clone(),
            &args.platform,
            args.init_file.clone(),
            args.init_pkg.clone(),
        )?;
        let pkgfpath = builder.run()?;

        if args.install || args.publish {
            let pkgf = PackageFile::new(&pkgfpath);
            let pkg = dom.install(&pkgf, args.common.force, false)?;
            if args.publish {
                dom.prepublish(&pkg, &args.platform)?;
                dom.publish(&pkg, &args.platform, args.common.force)?;
            }
        }
    }
    Ok(())
}
