//! `ssm created`: create a new domain.
//!
//! Grounded on `ssm_created.py`.

use ssm_control::Control;
use ssm_domain::{Domain, SSM_VERSION};

use crate::cli::CreatedArgs;
use crate::error::Error;

pub fn run(args: CreatedArgs) -> Result<(), Error> {
    let mut meta = Control::new();
    meta.set("label", args.label.unwrap_or_default());
    meta.set(
        "repository",
        args.repo.map(|p| p.display().to_string()).unwrap_or_default(),
    );
    meta.set("version", SSM_VERSION);

    let dom = Domain::new(&args.dompath);
    dom.create(&meta, args.common.force)?;
    Ok(())
}
