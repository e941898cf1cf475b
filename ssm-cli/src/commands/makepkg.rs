//! `ssm makepkg`: package a source directory into a `.ssm` archive.
//!
//! Grounded on `ssm_makepkg.py`.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use ssm_control::Control;
use ssm_types::PackageName;

use crate::cli::MakepkgArgs;
use crate::error::Error;

fn control_json_bytes(control: &Control) -> Vec<u8> {
    let sorted: BTreeMap<&String, &serde_json::Value> = control.as_map().iter().collect();
    serde_json::to_vec_pretty(&sorted).unwrap_or_default()
}

fn warn_if_missing(srcdir: &Path, relpath: &str) {
    if !srcdir.join(relpath).exists() {
        eprintln!("warning: {relpath} not found");
    }
}

pub fn run(args: MakepkgArgs) -> Result<(), Error> {
    if !args.dir.is_dir() {
        return Err(Error::DirectoryNotFound);
    }
    let auto_control = args.auto_control || args.name.is_some();

    let basename = match &args.name {
        Some(name) => name.clone(),
        None => args
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(Error::BadArguments)?,
    };
    let parsed: PackageName = basename
        .parse()
        .map_err(|_| Error::BadPackageName(basename.clone()))?;

    let control_path = args.dir.join(".ssm.d/control.json");
    let control = if auto_control {
        let mut control = Control::new();
        control.set("name", parsed.short().to_string());
        control.set("version", parsed.version().as_str().to_string());
        control.set("platform", parsed.platform().as_str().to_string());
        control
    } else {
        if !control_path.exists() {
            return Err(Error::OperationFailed(
                "no control.json found; use --auto-control to generate one".to_string(),
            ));
        }
        Control::load(&control_path)?
    };

    warn_if_missing(&args.dir, "post-install");
    warn_if_missing(&args.dir, "pre-uninstall");
    warn_if_missing(&args.dir, &format!("etc/profile.d/{basename}.sh"));
    warn_if_missing(&args.dir, &format!("etc/profile.d/{basename}.csh"));

    let pkgfpath = args.dir.with_file_name(format!("{basename}.ssm"));
    if let Err(source) = write_package(&args.dir, &basename, &control, &pkgfpath) {
        let _ = fs::remove_file(&pkgfpath);
        return Err(source);
    }
    Ok(())
}

fn write_package(srcdir: &Path, basename: &str, control: &Control, pkgfpath: &Path) -> Result<(), Error> {
    let file = File::create(pkgfpath).map_err(|source| Error::Io {
        path: pkgfpath.to_path_buf(),
        source,
    })?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in walkdir_relative(srcdir)? {
        if entry == Path::new(".ssm.d/control.json") || entry == Path::new(".ssm.d/control") {
            continue;
        }
        let abspath = srcdir.join(&entry);
        let archive_path = Path::new(basename).join(&entry);
        if abspath.is_dir() {
            builder
                .append_dir(&archive_path, &abspath)
                .map_err(|source| Error::Io { path: abspath.clone(), source })?;
        } else {
            let mut f = File::open(&abspath).map_err(|source| Error::Io { path: abspath.clone(), source })?;
            builder
                .append_file(&archive_path, &mut f)
                .map_err(|source| Error::Io { path: abspath.clone(), source })?;
        }
    }

    let control_bytes = control_json_bytes(control);
    let mut header = tar::Header::new_gnu();
    header.set_size(control_bytes.len() as u64);
    header.set_mode(0o644);
    header.set_uid(nix::unistd::getuid().as_raw() as u64);
    header.set_gid(nix::unistd::getgid().as_raw() as u64);
    header.set_cksum();
    let control_archive_path = Path::new(basename).join(".ssm.d/control.json");
    builder
        .append_data(&mut header, &control_archive_path, control_bytes.as_slice())
        .map_err(|source| Error::Io { path: control_archive_path, source })?;

    builder.finish().map_err(|source| Error::Io {
        path: pkgfpath.to_path_buf(),
        source,
    })
}

fn walkdir_relative(root: &Path) -> Result<Vec<std::path::PathBuf>, Error> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<(), Error> {
        for entry in fs::read_dir(dir).map_err(|source| Error::Io { path: dir.to_path_buf(), source })? {
            let entry = entry.map_err(|source| Error::Io { path: dir.to_path_buf(), source })?;
            let path = entry.path();
            let rel = path.strip_prefix(base).unwrap_or(&path).to_path_buf();
            if path.is_dir() {
                out.push(rel.clone());
                walk(base, &path, out)?;
            } else {
                out.push(rel);
            }
        }
        Ok(())
    }
    let mut out = Vec::new();
    walk(root, root, &mut out)?;
    Ok(out)
}
