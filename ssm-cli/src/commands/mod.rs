//! One module per `ssm` subcommand, each a thin wrapper dispatching
//! into `ssm-domain`/`ssm-package`/`ssm-deps`/`ssm-build`/`ssm-repo`.

mod build;
mod cloned;
mod created;
mod diffd;
mod find;
mod install;
mod invd;
mod listd;
mod makepkg;
mod publish;
mod uninstall;
mod unpublish;
mod upgraded;

pub use build::run as build;
pub use cloned::run as cloned;
pub use created::run as created;
pub use diffd::run as diffd;
pub use find::run as find;
pub use install::run as install;
pub use invd::run as invd;
pub use listd::run as listd;
pub use makepkg::run as makepkg;
pub use publish::run as publish;
pub use uninstall::run as uninstall;
pub use unpublish::run as unpublish;
pub use upgraded::run as upgraded;

use std::io::{self, Write};

/// Prompts `message` on stdout and reads a one-line stdin reply,
/// matching `raw_input("unpublish all (y/n)? ")`. Returns true only on
/// an exact `y` reply.
pub(crate) fn confirm(message: &str) -> bool {
    print!("{message}");
    let _ = io::stdout().flush();
    let mut reply = String::new();
    if io::stdin().read_line(&mut reply).is_err() {
        return false;
    }
    reply.trim() == "y"
}
