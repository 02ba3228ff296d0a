//! Filesystem helpers built on `cap-std` and `camino`.
//!
//! Every helper resolves an ambient directory once (the filesystem root for
//! absolute paths, the working directory otherwise) and performs the rest of
//! the operation relative to that capability.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Open `path` for appending, creating the file and its parent directory
/// when missing.
pub fn open_append(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?;
    let (base_dir, relative) = base_dir_and_relative(parent)?;
    let dir = if relative.as_str().is_empty() {
        base_dir
    } else {
        base_dir.open_dir(&relative)?
    };
    let mut options = fs_utf8::OpenOptions::new();
    options.append(true).create(true);
    dir.open_with(file_name, &options)
}

/// Split a path into an ambient base directory and the remaining relative
/// suffix.
fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let base = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR.to_string())
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
        _ => Utf8PathBuf::from("."),
    };
    let relative = if path.is_absolute() {
        path.strip_prefix(&base)
            .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
            .to_path_buf()
    } else {
        path.to_path_buf()
    };
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}
