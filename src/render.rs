//! Template rendering and static tree copies.
//!
//! Templates use Tera placeholder syntax (`{{ host_port }}`). Rendering is
//! strict: a placeholder with no value in the [`BuildContext`] is an error,
//! never an empty string. Unused context keys are ignored.
//!
//! Output files are written to a temporary file in the destination directory
//! and renamed into place, so a concurrent reader never sees a partial file.

use std::error::Error as StdError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tera::Tera;
use tracing::info;

use crate::context::BuildContext;
use crate::error::{Error, Result};

/// Render `template` with `ctx` and write the result to `output`.
///
/// Parent directories of `output` are created as needed and an existing file
/// is replaced. The output keeps the template's permission bits so
/// executable init scripts stay executable. Returns `output`.
pub fn render(template: &Path, output: &Path, ctx: &BuildContext) -> Result<PathBuf> {
    let source = fs::read_to_string(template).map_err(|e| Error::Template {
        template: template.to_path_buf(),
        message: e.to_string(),
    })?;
    let rendered = render_str(template, &source, ctx)?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(rendered.as_bytes())
        .map_err(|e| Error::io(tmp.path(), e))?;
    let permissions = fs::metadata(template)
        .map_err(|e| Error::io(template, e))?
        .permissions();
    fs::set_permissions(tmp.path(), permissions).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(output).map_err(|e| Error::io(output, e.error))?;

    info!("Wrote {}", output.display());
    Ok(output.to_path_buf())
}

/// Render template `source` in memory. `template` is only used for naming.
pub fn render_str(template: &Path, source: &str, ctx: &BuildContext) -> Result<String> {
    let name = template.to_string_lossy();
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_template(&name, source)
        .map_err(|e| template_error(template, &e))?;
    tera.render(&name, &ctx.to_tera())
        .map_err(|e| template_error(template, &e))
}

/// Recursively copy `src` into `dst`, merging with anything already there.
///
/// Directories merge. Any other entry at a destination path is replaced, so a
/// stale symlink is never written through.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src).map_err(|e| Error::io(src, e))?;

    if !meta.is_dir() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        return copy_entry(src, dst, &meta);
    }

    clear_destination(dst, true)?;
    fs::create_dir_all(dst).map_err(|e| Error::io(dst, e))?;

    for entry in fs::read_dir(src).map_err(|e| Error::io(src, e))? {
        let entry = entry.map_err(|e| Error::io(src, e))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let meta = fs::symlink_metadata(&src_path).map_err(|e| Error::io(&src_path, e))?;

        if meta.is_dir() {
            copy_tree(&src_path, &dst_path)?;
        } else {
            copy_entry(&src_path, &dst_path, &meta)?;
        }
    }

    Ok(())
}

/// Copy a file or recreate a symlink at `dst`.
fn copy_entry(src: &Path, dst: &Path, meta: &fs::Metadata) -> Result<()> {
    clear_destination(dst, false)?;
    if meta.file_type().is_symlink() {
        let target = fs::read_link(src).map_err(|e| Error::io(src, e))?;
        std::os::unix::fs::symlink(&target, dst).map_err(|e| Error::io(dst, e))?;
    } else {
        fs::copy(src, dst).map_err(|e| Error::io(src, e))?;
    }
    Ok(())
}

/// Remove whatever is at `path` unless it is a real directory and
/// `keep_dir` is set.
fn clear_destination(path: &Path, keep_dir: bool) -> Result<()> {
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
        Ok(meta) if meta.is_dir() => {
            if keep_dir {
                Ok(())
            } else {
                fs::remove_dir_all(path).map_err(|e| Error::io(path, e))
            }
        }
        Ok(_) => fs::remove_file(path).map_err(|e| Error::io(path, e)),
    }
}

/// Classify a Tera failure, pulling out the placeholder name when a
/// variable was missing from the context.
fn template_error(template: &Path, err: &tera::Error) -> Error {
    let mut messages = Vec::new();
    let mut current: Option<&dyn StdError> = Some(err);
    while let Some(e) = current {
        messages.push(e.to_string());
        current = e.source();
    }

    if let Some(name) = messages.iter().find_map(|m| missing_variable(m)) {
        return Error::MissingPlaceholder {
            template: template.to_path_buf(),
            name,
        };
    }

    Error::Template {
        template: template.to_path_buf(),
        message: messages.join(": "),
    }
}

/// Extract `x` from Tera's "Variable `x` not found in context ..." message.
fn missing_variable(message: &str) -> Option<String> {
    let start = message.find("Variable `")? + "Variable `".len();
    let rest = &message[start..];
    let end = rest.find("` not found in context")?;
    Some(rest[..end].to_string())
}
