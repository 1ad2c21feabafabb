use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Writes data atomically by using a temporary sibling file followed by rename.  
/// 以臨時檔案搭配 rename 實現原子寫入。
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, data)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

/// Drops root, prefix and `.` components so the path can be looked up inside a project.
/// Returns `None` when the path climbs out with `..`.  
/// 移除根目錄與 `.`，轉為專案內的相對路徑；含 `..` 時回傳 `None`。
pub fn make_relative(path: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::ParentDir => return None,
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
        }
    }
    Some(relative)
}

/// `/`-separated rendering used for persisted project-relative paths.
pub fn portable_string(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_relative_strips_root_and_current_dir() {
        assert_eq!(make_relative(Path::new("/usr/lib")), Some(PathBuf::from("usr/lib")));
        assert_eq!(make_relative(Path::new(".")), Some(PathBuf::new()));
        assert_eq!(make_relative(Path::new("./src/./core")), Some(PathBuf::from("src/core")));
        assert_eq!(make_relative(Path::new("../outside")), None);
    }

    #[test]
    fn portable_string_joins_with_slashes() {
        let path: PathBuf = ["src", "parser"].iter().collect();
        assert_eq!(portable_string(&path), "src/parser");
        assert_eq!(portable_string(Path::new("")), "");
    }

    #[test]
    fn write_atomic_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join(".paths");
        write_atomic(&target, b".\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), ".\n");
        assert!(!dir.path().join("nested").join(".paths.tmp").exists());
    }

    #[test]
    fn write_atomic_failure_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(".paths");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("occupant"), "").unwrap();

        assert!(write_atomic(&target, b".\n").is_err());
        assert!(!dir.path().join(".paths.tmp").exists());
        assert!(target.is_dir());
    }
}
