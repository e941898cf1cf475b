//! `ssm install`: install a package into a domain from a package file,
//! a repository, a source directory, or a control-only skeleton.
//!
//! Grounded on `ssm_install.py`.

use ssm_common::fs;
use ssm_domain::Domain;
use ssm_package::{Package, PackageFile, PackageFileSkeleton, PackageSource, SKELETON_COMPS};
use ssm_repo::RepositoryGroup;

use crate::cli::InstallArgs;
use crate::error::Error;

pub fn run(args: InstallArgs) -> Result<(), Error> {
    if args.name.is_none() && args.file.is_none() {
        return Err(Error::BadArguments);
    }

    let dom = Domain::new(&args.dompath);
    if !dom.exists() {
        return Err(Error::DomainNotFound(args.dompath.clone()));
    }
    let meta = dom.get_meta()?;
    if meta.version().is_none() {
        return Err(Error::LegacyDomain(args.dompath.clone()));
    }

    if let Some(file) = &args.file {
        let pkgf = PackageFile::new(file);
        dom.install(&pkgf, args.common.force, args.reinstall)?;
        return Ok(());
    }

    if args.skeleton {
        let pkgname = args.name.as_deref().ok_or(Error::BadArguments)?;
        let skeleton = PackageFileSkeleton::new(
            format!("{pkgname}.ssm"),
            SKELETON_COMPS.iter().map(|c| c.to_string()).collect(),
        );
        dom.install(&skeleton, args.common.force, args.reinstall)?;
        return Ok(());
    }

    if let Some(srcdir) = &args.srcdir {
        let pkgname = args.name.as_deref().ok_or(Error::BadArguments)?;
        let pkg = Package::new(dom.path.join(pkgname));
        if pkg.path.exists() && (!args.reinstall || !args.common.force) {
            return Err(Error::OperationFailed("package is installed".to_string()));
        }

        let names: Vec<String> = match &args.names {
            Some(csv) => csv.split(',').map(str::trim).map(str::to_string).collect(),
            None => fs::list_dir_names_one_level(srcdir)?,
        };

        if !pkg.path.exists() {
            fs::makedirs(&pkg.path)?;
        }
        for name in &names {
            if name.contains('/') {
                eprintln!("warning: name ({name}) cannot be installed");
                continue;
            }
            let srcpath = srcdir.join(name);
            let dstpath = pkg.path.join(name);
            if srcpath.exists() {
                fs::symlink(&srcpath, &dstpath, true)?;
            }
        }

        let skeleton = PackageFileSkeleton::new(
            format!("{pkgname}.ssm"),
            vec!["control".to_string()],
        );
        dom.install(&skeleton, true, args.reinstall)?;
        return Ok(());
    }

    let pkgname = args.name.as_deref().ok_or(Error::BadArguments)?;
    let repo = if let Some(url) = &args.repo {
        RepositoryGroup::from_urls([url.clone()])
    } else {
        dom.get_repository()?.ok_or(Error::NoRepository)?
    };
    let pkgf = repo
        .get_packagefile(pkgname)
        .ok_or_else(|| Error::PackageFileNotFound(pkgname.to_string()))?;
    dom.install(&pkgf, args.common.force, args.reinstall)?;
    Ok(())
}
