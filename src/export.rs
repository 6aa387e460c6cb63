use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::library::GenreNode;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize genre tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes the tree as JSON. The file is written next to `path` first and
/// renamed into place, so `path` never holds a partial tree.
pub fn write_tree(root: &GenreNode, path: &Path, pretty: bool) -> Result<(), ExportError> {
    let tmp_path = temporary_path(path);
    let result = write_json(root, &tmp_path, pretty).and_then(|()| {
        fs::rename(&tmp_path, path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_json(root: &GenreNode, path: &Path, pretty: bool) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, root)?;
    } else {
        serde_json::to_writer(&mut writer, root)?;
    }
    writer.flush().map_err(io_error)
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
