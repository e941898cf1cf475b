//! `ssm diffd`: compare two domains' metadata, installed packages, or
//! published packages.
//!
//! Grounded on `ssm_diffd.py`.

use std::collections::BTreeSet;

use ssm_domain::Domain;

use crate::cli::DiffdArgs;
use crate::error::Error;

const DIFF_MARK_LEFT_ONLY: char = '-';
const DIFF_MARK_BOTH: char = '=';
const DIFF_MARK_RIGHT_ONLY: char = '+';

fn mark(left: bool, right: bool) -> char {
    match (left, right) {
        (true, false) => DIFF_MARK_LEFT_ONLY,
        (true, true) => DIFF_MARK_BOTH,
        (false, true) => DIFF_MARK_RIGHT_ONLY,
        (false, false) => unreachable!("value must belong to at least one side"),
    }
}

pub fn run(args: DiffdArgs) -> Result<(), Error> {
    let ldom = Domain::new(&args.left);
    let rdom = Domain::new(&args.right);
    if !ldom.exists() {
        return Err(Error::DomainNotFound(args.left));
    }
    if !rdom.exists() {
        return Err(Error::DomainNotFound(args.right));
    }
    let lmeta = ldom.get_meta()?;
    let rmeta = rdom.get_meta()?;
    if lmeta.version().is_none() {
        return Err(Error::LegacyDomain(args.left));
    }
    if rmeta.version().is_none() {
        return Err(Error::LegacyDomain(args.right));
    }

    let (want_meta, want_installed, want_published) = if !args.meta && !args.installed && !args.published {
        (false, true, true)
    } else {
        (args.meta, args.installed, args.published)
    };

    if want_meta {
        println!("----- meta -----");
        let mut keys: BTreeSet<&String> = lmeta.as_map().keys().collect();
        keys.extend(rmeta.as_map().keys());
        for key in keys {
            let lval = lmeta.get(key);
            let rval = rmeta.get(key);
            let mark = mark(lval.is_some(), rval.is_some());
            if lval == rval {
                println!("= {key}: {}", lval.map(|v| v.to_string()).unwrap_or_default());
            } else {
                println!(
                    "{mark} {key}: {} / {}",
                    lval.map(|v| v.to_string()).unwrap_or_default(),
                    rval.map(|v| v.to_string()).unwrap_or_default()
                );
            }
        }
    }

    if want_installed {
        println!("----- installed -----");
        let lnames: BTreeSet<String> = ldom
            .get_installed_packages(None)?
            .into_iter()
            .map(|p| p.name)
            .collect();
        let rnames: BTreeSet<String> = rdom
            .get_installed_packages(None)?
            .into_iter()
            .map(|p| p.name)
            .collect();
        let mut names: BTreeSet<&String> = lnames.iter().collect();
        names.extend(rnames.iter());
        for name in names {
            println!("{} {name}", mark(lnames.contains(name), rnames.contains(name)));
        }
    }

    if want_published {
        println!("----- published -----");
        let mut lplatforms = ldom.get_published_platforms()?;
        let mut rplatforms = rdom.get_published_platforms()?;
        lplatforms.sort();
        rplatforms.sort();
        let mut platforms: BTreeSet<String> = lplatforms.iter().cloned().collect();
        platforms.extend(rplatforms.iter().cloned());

        for platform in platforms {
            let platform_filter = [platform.clone()];
            let lnames: BTreeSet<String> = ldom
                .get_published_packages(Some(&platform_filter))?
                .into_iter()
                .map(|p| p.name)
                .collect();
            let rnames: BTreeSet<String> = rdom
                .get_published_packages(Some(&platform_filter))?
                .into_iter()
                .map(|p| p.name)
                .collect();
            let mut names: BTreeSet<&String> = lnames.iter().collect();
            names.extend(rnames.iter());
            for name in names {
                println!(
                    "{} {platform}/{name}",
                    mark(lnames.contains(name), rnames.contains(name))
                );
            }
        }
    }

    Ok(())
}
