//! Project source-path management for camlpad.
//! 管理 camlpad 專案原始碼搜尋路徑的核心模組。

mod serde_path;
mod util;

pub mod config;
pub mod fs_tree;
pub mod library;
pub mod paths;
pub mod paths_store;
pub mod resource;

pub use config::{Config, ConfigError, ConfigStore, LibrarySettings, ProjectLayout};
pub use fs_tree::{FsResourceTree, ProjectDescriptor, PROJECT_DESCRIPTOR};
pub use library::{EnvLibrary, FixedLibrary, LibraryLocator};
pub use paths::{PathListResolver, PathsError, PROJECT_ROOT_ENTRY};
pub use paths_store::PathsStore;
pub use resource::{Project, Resource, ResourceError, ResourceKind, ResourceTree};
