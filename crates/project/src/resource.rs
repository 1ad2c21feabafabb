use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A project known to the resource tree.
/// 資源樹中的專案。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Project {
    name: String,
    location: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute directory holding the project on disk.
    /// 專案在磁碟上的絕對路徑。
    pub fn location(&self) -> &Path {
        &self.location
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Project,
    Folder,
    File,
}

/// A member of a project as reported by the resource tree.
/// 資源樹回報的專案成員。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    /// Workspace-relative path; the first segment is the owning project's name.
    pub full_path: PathBuf,
    /// Whether the resource points at a location outside the project.
    pub linked: bool,
}

impl Resource {
    pub fn project(project: &Project) -> Self {
        Self {
            kind: ResourceKind::Project,
            name: project.name().to_string(),
            full_path: PathBuf::from(project.name()),
            linked: false,
        }
    }

    pub fn folder(project: &Project, relative: impl AsRef<Path>, linked: bool) -> Self {
        Self::member(ResourceKind::Folder, project, relative.as_ref(), linked)
    }

    pub fn file(project: &Project, relative: impl AsRef<Path>, linked: bool) -> Self {
        Self::member(ResourceKind::File, project, relative.as_ref(), linked)
    }

    fn member(kind: ResourceKind, project: &Project, relative: &Path, linked: bool) -> Self {
        let name = relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| project.name().to_string());
        Self {
            kind,
            name,
            full_path: Path::new(project.name()).join(relative),
            linked,
        }
    }

    /// Path relative to the project root (the full path minus its first segment).
    pub fn project_path(&self) -> PathBuf {
        self.full_path.components().skip(1).collect()
    }

    /// Folders and the project itself can be used as search directories.
    pub fn is_container(&self) -> bool {
        matches!(self.kind, ResourceKind::Folder | ResourceKind::Project)
    }
}

/// Errors raised by resource-tree operations.
/// 資源樹操作錯誤。
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("project {0} not found")]
    ProjectNotFound(String),
    #[error("invalid project descriptor {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },
    #[error("invalid property store {path}: {reason}")]
    InvalidProperties { path: PathBuf, reason: String },
    #[error("invalid link location {target}: {reason}")]
    InvalidLink { target: PathBuf, reason: String },
}

impl ResourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_link(target: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidLink {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Project resource tree consumed by the path resolver.
///
/// All member paths are relative to the project root; the empty path names the
/// project itself.
/// 路徑解析器所需的專案資源樹介面；成員路徑皆相對於專案根目錄。
pub trait ResourceTree {
    /// Projects whose path lists are merged into `project`'s list.
    fn referenced_projects(&self, project: &Project) -> Result<Vec<Project>, ResourceError>;

    /// Every folder of the project, nested ones included.
    fn project_folders(&self, project: &Project) -> Result<Vec<Resource>, ResourceError>;

    /// Looks up an existing member; `None` when nothing exists there.
    fn find_member(&self, project: &Project, path: &Path) -> Option<Resource>;

    fn create_folder(&self, project: &Project, path: &Path) -> Result<(), ResourceError>;

    fn property(
        &self,
        project: &Project,
        path: &Path,
        key: &str,
    ) -> Result<Option<String>, ResourceError>;

    fn set_property(
        &self,
        project: &Project,
        path: &Path,
        key: &str,
        value: &str,
    ) -> Result<(), ResourceError>;

    /// Checks that a link at `link` may point at `target`.
    fn validate_link_location(
        &self,
        project: &Project,
        link: &Path,
        target: &Path,
    ) -> Result<(), ResourceError>;

    /// Creates a link at `link` pointing at `target`, replacing an existing link.
    fn create_link(&self, project: &Project, link: &Path, target: &Path)
        -> Result<(), ResourceError>;
}
