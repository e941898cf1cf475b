//! `ssm cloned`: share one or more source domains' installed/published
//! packages into a destination domain.
//!
//! Grounded on `ssm_cloned.py`. A cloned domain's installed packages are
//! registered as symlinks straight at the source domain's package
//! directories rather than re-unpacked (matching I2: a domain's
//! registries may reference packages reachable only through another
//! domain), and `--published-src` (the default) publishes directly from
//! the source domain's installed copies instead of requiring them to be
//! cloned-installed first.

use ssm_domain::{Domain, SSM_VERSION};

use crate::cli::ClonedArgs;
use crate::error::Error;

fn parse_platforms(csv: &str) -> Vec<String> {
    csv.split(',').map(str::trim).map(str::to_string).collect()
}

pub fn run(args: ClonedArgs) -> Result<(), Error> {
    let dst = Domain::new(&args.dstdom);
    if !dst.exists() {
        let last_src = args
            .srcdoms
            .last()
            .cloned()
            .ok_or(Error::BadArguments)?;
        let last_dom = Domain::new(&last_src);
        if !last_dom.exists() {
            return Err(Error::DomainNotFound(last_src));
        }

        let mut meta = last_dom.get_meta()?;
        if let Some(label) = &args.label {
            meta.set("label", label.clone());
        }
        if let Some(repo) = &args.repo {
            meta.set("repository", repo.display().to_string());
        }
        meta.set("version", SSM_VERSION);
        dst.create(&meta, args.common.force)?;
    }
    if dst.get_meta()?.version().is_none() {
        return Err(Error::LegacyDomain(args.dstdom.clone()));
    }

    let platform_filter: Option<Vec<String>> = args.platforms.as_deref().map(parse_platforms);
    let publish_from_dst = args.published && !args.published_src;

    for srcdompath in &args.srcdoms {
        let src = Domain::new(srcdompath);
        if !src.exists() {
            return Err(Error::DomainNotFound(srcdompath.clone()));
        }
        if src.get_meta()?.version().is_none() {
            return Err(Error::LegacyDomain(srcdompath.clone()));
        }

        if args.installed {
            for pkg in src.get_installed_packages(platform_filter.as_deref())? {
                if dst.is_installed(&pkg) && !args.installed_overwrite && !args.common.force {
                    continue;
                }
                dst.register_installed(&pkg)?;
            }
        }

        if args.published || args.published_src {
            let platforms = match &platform_filter {
                Some(platforms) => platforms.clone(),
                None => src.get_published_platforms()?,
            };

            for platform in &platforms {
                let one_platform = [platform.clone()];
                for srcpkg in src.get_published_packages(Some(&one_platform))? {
                    let pkg = if publish_from_dst {
                        dst.get_installed_package(&srcpkg.name)
                            .ok_or_else(|| Error::PackageNotFound(srcpkg.name.clone()))?
                    } else {
                        srcpkg
                    };
                    dst.prepublish(&pkg, platform)?;
                    dst.publish(&pkg, platform, args.common.force)?;
                }
            }
        }
    }

    Ok(())
}
