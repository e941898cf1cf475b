//! `ssm listd`: list installed/published packages in a domain, grouped
//! by platform.
//!
//! Grounded on `ssm_listd.py`.

use std::collections::BTreeMap;

use ssm_common::platform_env::determine_platforms;
use ssm_domain::Domain;

use crate::cli::ListdArgs;
use crate::config::Config;
use crate::error::Error;
use crate::output::{columnize, glob_filter, glob_match, terminal_width};

pub fn run(args: ListdArgs, config: &Config) -> Result<(), Error> {
    let dom = Domain::new(&args.dompath);
    if !dom.exists() {
        return Err(Error::DomainNotFound(args.dompath.clone()));
    }
    if dom.get_meta()?.version().is_none() {
        return Err(Error::LegacyDomain(args.dompath.clone()));
    }

    let all_domain_platforms = || -> Result<Vec<String>, Error> {
        let mut all: Vec<String> = dom.get_installed_platforms()?;
        all.extend(dom.get_published_platforms()?);
        all.sort();
        all.dedup();
        Ok(all)
    };

    let platforms = match &args.platpat {
        Some(platpat) => glob_filter(&all_domain_platforms()?, platpat),
        None if config.list_for_all_platforms => all_domain_platforms()?,
        None => {
            let platforms = determine_platforms();
            if platforms.is_empty() {
                return Err(Error::OperationFailed("cannot determine platforms".to_string()));
            }
            platforms
        }
    };

    let mut sorted_platforms = platforms;
    sorted_platforms.sort();

    let width = terminal_width();
    let mut first = true;
    for platform in &sorted_platforms {
        let platform_filter = [platform.clone()];
        let ipkgs = dom.get_installed_packages(Some(&platform_filter))?;
        let ppkgs = dom.get_published_packages(Some(&platform_filter))?;

        let mut state_and_path: BTreeMap<String, (String, String)> = BTreeMap::new();
        for ipkg in &ipkgs {
            state_and_path
                .entry(ipkg.name.clone())
                .or_insert_with(|| (String::new(), ipkg.path.display().to_string()))
                .0
                .push('I');
        }
        for ppkg in &ppkgs {
            let entry = state_and_path
                .entry(ppkg.name.clone())
                .or_insert_with(|| (String::new(), ppkg.path.display().to_string()));
            entry.0.push(if entry.0.contains('I') { 'P' } else { 'p' });
            entry.1 = ppkg.path.display().to_string();
        }

        let mut names: Vec<String> = state_and_path.keys().cloned().collect();
        if let Some(pkgpat) = &args.pkgpat {
            names.retain(|name| glob_match(pkgpat, name));
        }
        if names.is_empty() {
            continue;
        }

        if first {
            first = false;
        } else {
            println!();
        }
        println!("----- platform ({platform}) -----");

        let lines: Vec<String> = names
            .iter()
            .map(|name| {
                let (state, path) = &state_and_path[name];
                if args.long {
                    format!("{state:<4}  {name:<40}  {path}")
                } else {
                    format!("{state:<4}  {name:<40}")
                }
            })
            .collect();

        if args.long {
            for line in &lines {
                println!("{line}");
            }
        } else {
            for line in columnize(&lines, width, 2) {
                println!("{line}");
            }
        }
    }
    Ok(())
}
