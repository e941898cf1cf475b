//! `ssm invd`: dump a domain's full inventory as JSON.
//!
//! Grounded on `ssm_invd.py`.

use serde_json::json;
use ssm_domain::Domain;

use crate::cli::InvdArgs;
use crate::error::Error;

pub fn run(args: InvdArgs) -> Result<(), Error> {
    let dom = Domain::new(&args.dompath);
    if !dom.exists() {
        return Err(Error::DomainNotFound(args.dompath.clone()));
    }
    if dom.get_meta()?.version().is_none() {
        return Err(Error::LegacyDomain(args.dompath));
    }

    let inventory = dom.get_inventory()?;
    let installed: serde_json::Map<String, serde_json::Value> = inventory
        .installed
        .iter()
        .map(|(name, path)| (name.clone(), json!(path.display().to_string())))
        .collect();
    let published: serde_json::Map<String, serde_json::Value> = inventory
        .published
        .iter()
        .map(|(platform, pkgs)| {
            let pkgs: serde_json::Map<String, serde_json::Value> = pkgs
                .iter()
                .map(|(name, path)| (name.clone(), json!(path.display().to_string())))
                .collect();
            (platform.clone(), serde_json::Value::Object(pkgs))
        })
        .collect();

    let value = json!({
        "path": inventory.path.display().to_string(),
        "meta": inventory.meta.as_map(),
        "legacy": inventory.legacy,
        "installed": installed,
        "published": published,
    });

    println!("{}", serde_json::to_string_pretty(&value).map_err(|source| {
        Error::Io {
            path: args.dompath.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, source),
        }
    })?);
    Ok(())
}
