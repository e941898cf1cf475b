//! `ssm find`: recursively discover domains under a set of starting
//! paths and list their packages.
//!
//! Grounded on `ssm_find.py`.

use std::env;

use ssm_common::platform_env::determine_platforms;
use ssm_domain::{find_domains, Domain};

use crate::cli::FindArgs;
use crate::error::Error;
use crate::output::{columnize, glob_match, terminal_width};

fn env_paths() -> Vec<std::path::PathBuf> {
    env::var("SSMUSE_PATH")
        .ok()
        .map(|v| v.split(':').map(std::path::PathBuf::from).collect())
        .unwrap_or_default()
}

pub fn run(args: FindArgs) -> Result<(), Error> {
    let paths = if args.paths.is_empty() { env_paths() } else { args.paths.clone() };
    let dompat = args.bothpat.clone().or_else(|| args.dompat.clone());
    let pkgpat = args.bothpat.clone().or_else(|| args.pkgpat.clone());

    let domains = find_domains(&paths)?;
    let width = terminal_width();

    for dompath in domains {
        if let Some(pat) = &dompat {
            if !glob_match(pat, &dompath.display().to_string()) {
                continue;
            }
        }

        let dom = Domain::new(&dompath);
        if dom.get_meta().ok().and_then(|m| m.version().map(str::to_string)).is_none() {
            continue;
        }

        let mut platforms = match &args.platpat {
            Some(platpat) => {
                let mut all = dom.get_installed_platforms().unwrap_or_default();
                all.extend(dom.get_published_platforms().unwrap_or_default());
                all.sort();
                all.dedup();
                all.into_iter().filter(|p| glob_match(platpat, p)).collect()
            }
            None => determine_platforms(),
        };
        platforms.sort();

        let mut lines = Vec::new();
        for platform in &platforms {
            let platform_filter = [platform.clone()];
            let ipkgs = dom.get_installed_packages(Some(&platform_filter)).unwrap_or_default();
            let ppkgs = dom.get_published_packages(Some(&platform_filter)).unwrap_or_default();

            let mut names: Vec<String> = ipkgs
                .iter()
                .map(|p| p.name.clone())
                .chain(ppkgs.iter().map(|p| p.name.clone()))
                .collect();
            names.sort();
            names.dedup();

            for name in names {
                if let Some(pat) = &pkgpat {
                    if !glob_match(pat, &name) {
                        continue;
                    }
                }
                let installed = ipkgs.iter().any(|p| p.name == name);
                let published = ppkgs.iter().any(|p| p.name == name);
                let status = match (installed, published) {
                    (true, true) => "P",
                    (true, false) => "I",
                    (false, true) => "p",
                    (false, false) => continue,
                };
                if args.csv {
                    println!("{},{status},{platform},{name}", dompath.display());
                } else {
                    lines.push(format!("{status:<4}  {platform:<26}  {name:<30}"));
                }
            }
        }

        if lines.is_empty() || args.csv {
            continue;
        }
        println!("----- domain ({}) -----", dompath.display());
        for line in columnize(&lines, width, 2) {
            println!("{line}");
        }
    }
    Ok(())
}
