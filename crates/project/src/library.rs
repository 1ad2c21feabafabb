use std::env;
use std::path::PathBuf;

/// Environment variable naming the OCaml standard library directory.
pub const OCAMLLIB_VAR: &str = "OCAMLLIB";

/// Location used when nothing else names the standard library.
pub const DEFAULT_LIBRARY_PATH: &str = "/usr/local/lib/ocaml";

/// Supplies the shared library directory appended to every default path list.
/// 提供預設路徑清單最後一項的共用函式庫位置。
pub trait LibraryLocator {
    fn library_path(&self) -> PathBuf;
}

/// A library location fixed by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLibrary {
    path: PathBuf,
}

impl FixedLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LibraryLocator for FixedLibrary {
    fn library_path(&self) -> PathBuf {
        self.path.clone()
    }
}

/// Reads the library location from an environment variable, with a fallback.
/// 從環境變數讀取函式庫位置，未設定時使用預設值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLibrary {
    variable: String,
    fallback: PathBuf,
}

impl EnvLibrary {
    pub fn new(variable: impl Into<String>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            variable: variable.into(),
            fallback: fallback.into(),
        }
    }
}

impl Default for EnvLibrary {
    fn default() -> Self {
        Self::new(OCAMLLIB_VAR, DEFAULT_LIBRARY_PATH)
    }
}

impl LibraryLocator for EnvLibrary {
    fn library_path(&self) -> PathBuf {
        match env::var_os(&self.variable) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => self.fallback.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_uses_fallback() {
        let locator = EnvLibrary::new("CAMLPAD_TEST_UNSET_LIBRARY_VAR", "/opt/fallback");
        assert_eq!(locator.library_path(), PathBuf::from("/opt/fallback"));
    }

    #[test]
    fn fixed_library_returns_configured_path() {
        let locator = FixedLibrary::new("/srv/ocaml");
        assert_eq!(locator.library_path(), PathBuf::from("/srv/ocaml"));
    }
}
