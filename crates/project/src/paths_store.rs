use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::util::write_atomic;

/// Persists a path list as plain text, one entry per line.
/// 以純文字（每行一個路徑）儲存路徑清單。
#[derive(Debug)]
pub struct PathsStore {
    path: PathBuf,
}

impl PathsStore {
    /// Constructs a store bound to the provided file.
    /// 建立綁定至指定檔案的儲存器。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads every line of the file in order; no filtering or sorting.
    /// 依序讀取每一行，不做排序或過濾。
    pub fn load(&self) -> io::Result<Vec<String>> {
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    /// Writes each entry followed by `\n`.
    /// 每個項目後接換行寫入。
    pub fn save<S: AsRef<str>>(&self, entries: &[S]) -> io::Result<()> {
        let mut payload = String::new();
        for entry in entries {
            payload.push_str(entry.as_ref());
            payload.push('\n');
        }
        write_atomic(&self.path, payload.as_bytes())
    }
}
