//! Ordered source search paths of a project.
//!
//! The list lives in a plain text file inside the project (one entry per line)
//! and is what the compiler receives through `-I`. Entries are either absolute
//! directories or project-relative folders, `.` being the project root.
//! 專案的原始碼搜尋路徑清單：以純文字檔保存，並合併參照專案的路徑。

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ProjectLayout;
use crate::library::LibraryLocator;
use crate::paths_store::PathsStore;
use crate::resource::{Project, Resource, ResourceError, ResourceTree};
use crate::util::{make_relative, portable_string};

/// Entry standing for the project root.
pub const PROJECT_ROOT_ENTRY: &str = ".";

const MARKER_VALUE: &str = "true";

/// Errors surfaced by path-list mutations. Each one has already been logged.
/// 路徑清單操作的錯誤；回傳前皆已寫入記錄。
#[derive(Debug, Error)]
pub enum PathsError {
    #[error("failed to read path list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write path list {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare external sources folder {folder}: {source}")]
    ExternalSources {
        folder: PathBuf,
        #[source]
        source: ResourceError,
    },
}

/// Resolves, persists and derives project path lists.
/// 解析、儲存並推導專案路徑清單。
pub struct PathListResolver<'a> {
    tree: &'a dyn ResourceTree,
    library: &'a dyn LibraryLocator,
    layout: ProjectLayout,
}

impl<'a> PathListResolver<'a> {
    pub fn new(
        tree: &'a dyn ResourceTree,
        library: &'a dyn LibraryLocator,
        layout: ProjectLayout,
    ) -> Self {
        Self {
            tree,
            library,
            layout,
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Store backing the path file of `project`.
    pub fn store(&self, project: &Project) -> PathsStore {
        PathsStore::new(project.location().join(&self.layout.paths_file))
    }

    /// Returns the project's path list followed by the lists of its referenced
    /// projects, relative entries of those expanded against their own location.
    ///
    /// A missing path file is first filled with the default list. Read failures
    /// are logged and yield an empty list.
    /// 取得路徑清單（含參照專案的路徑）；讀取失敗時記錄並回傳空清單。
    pub fn paths(&self, project: &Project) -> Vec<String> {
        let mut visiting = Vec::new();
        self.collect_paths(project, &mut visiting)
    }

    fn collect_paths(&self, project: &Project, visiting: &mut Vec<String>) -> Vec<String> {
        let mut paths = match self.persisted_paths(project) {
            Ok(paths) => paths,
            Err(_) => return Vec::new(),
        };

        visiting.push(project.name().to_string());
        self.append_referenced_paths(project, &mut paths, visiting);
        visiting.pop();
        paths
    }

    /// Reads the path file alone, restoring defaults when it does not exist yet.
    fn persisted_paths(&self, project: &Project) -> Result<Vec<String>, PathsError> {
        let store = self.store(project);
        if !store.exists() {
            log::info!(
                "no path list for project {}, restoring defaults",
                project.name()
            );
            if let Err(err) = self.restore_defaults(project) {
                log::debug!("default path list for {} not written: {err}", project.name());
            }
        }

        store.load().map_err(|source| {
            let err = PathsError::Read {
                path: store.path().to_path_buf(),
                source,
            };
            log::error!("{err}");
            err
        })
    }

    fn append_referenced_paths(
        &self,
        project: &Project,
        paths: &mut Vec<String>,
        visiting: &mut Vec<String>,
    ) {
        let referenced = match self.tree.referenced_projects(project) {
            Ok(referenced) => referenced,
            Err(err) => {
                log::error!(
                    "failed to get referenced projects paths for project {}: {err}",
                    project.name()
                );
                return;
            }
        };

        for reference in referenced {
            if visiting.iter().any(|name| name == reference.name()) {
                log::warn!(
                    "project {} references {} cyclically; its paths are not merged again",
                    project.name(),
                    reference.name()
                );
                continue;
            }

            for entry in self.collect_paths(&reference, visiting) {
                if Path::new(&entry).is_absolute() {
                    paths.push(entry);
                } else {
                    let absolute = reference.location().join(&entry);
                    paths.push(absolute.to_string_lossy().into_owned());
                }
            }
        }
    }

    /// Persists `paths` verbatim and links the source files of every external
    /// directory into the external sources folder.
    ///
    /// Directories are linked from last to first so that files found in earlier
    /// entries replace same-named files from later ones.
    /// 寫入路徑清單並為外部目錄中的原始檔建立連結；清單前面的目錄優先。
    pub fn set_paths<S: AsRef<str>>(
        &self,
        project: &Project,
        paths: &[S],
    ) -> Result<(), PathsError> {
        let store = self.store(project);
        if let Err(source) = store.save(paths) {
            let err = PathsError::Write {
                path: store.path().to_path_buf(),
                source,
            };
            log::error!("{err}");
            return Err(err);
        }

        let folder = PathBuf::from(&self.layout.external_sources_folder);
        if let Err(source) = self.prepare_external_sources(project, &folder) {
            let err = PathsError::ExternalSources { folder, source };
            log::error!("{err}");
            return Err(err);
        }

        for entry in paths.iter().rev() {
            let entry = entry.as_ref();
            if entry.is_empty() || self.is_relative_path(project, entry) {
                continue;
            }
            self.link_sources(project, &folder, Path::new(entry));
        }
        Ok(())
    }

    fn prepare_external_sources(
        &self,
        project: &Project,
        folder: &Path,
    ) -> Result<(), ResourceError> {
        let key = self.layout.external_sources_property.as_str();
        if self.tree.find_member(project, folder).is_none() {
            self.tree.create_folder(project, folder)?;
            self.tree.set_property(project, folder, key, MARKER_VALUE)?;
        }

        let tagged = match self.tree.property(project, folder, key) {
            Ok(value) => value.as_deref() == Some(MARKER_VALUE),
            Err(err) => {
                log::error!("failed to read property {key} of {}: {err}", folder.display());
                false
            }
        };
        if !tagged {
            if let Err(err) = self.tree.set_property(project, folder, key, MARKER_VALUE) {
                log::error!("failed to tag {} as external sources: {err}", folder.display());
            }
        }
        Ok(())
    }

    fn link_sources(&self, project: &Project, folder: &Path, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("cannot list {}: {err}", dir.display());
                return;
            }
        };

        let mut sources: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && self.is_source_file(path))
            .collect();
        sources.sort();

        for source in sources {
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let location = match absolute_location(&source) {
                Ok(location) => location,
                Err(err) => {
                    log::error!("cannot resolve {}: {err}", source.display());
                    continue;
                }
            };
            let link = folder.join(file_name);

            if let Err(err) = self.tree.validate_link_location(project, &link, &location) {
                log::warn!("not linking {}: {err}", location.display());
                continue;
            }
            match self.tree.create_link(project, &link, &location) {
                Ok(()) => log::debug!("linked {} -> {}", link.display(), location.display()),
                Err(err) => log::error!("failed to link {}: {err}", location.display()),
            }
        }
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| {
                name.ends_with(&format!(".{}", self.layout.source_extension))
            })
    }

    /// Rebuilds the default list: `.`, every eligible project folder, then the
    /// shared library directory.
    /// 重建預設清單：`.`、符合條件的專案資料夾、最後是共用函式庫位置。
    pub fn restore_defaults(&self, project: &Project) -> Result<(), PathsError> {
        let mut paths = vec![PROJECT_ROOT_ENTRY.to_string()];

        let folders = self.tree.project_folders(project).unwrap_or_else(|err| {
            log::error!("failed to list folders of project {}: {err}", project.name());
            Vec::new()
        });

        for folder in folders {
            if !self.is_path_candidate(project, &folder) || self.is_excluded(&folder) {
                continue;
            }

            let mut segments = folder.full_path.components();
            let relative: PathBuf = match segments.next() {
                Some(first) if first.as_os_str() == project.name() => segments.collect(),
                _ => folder.full_path.clone(),
            };
            paths.push(portable_string(&relative));
        }

        paths.push(self.library.library_path().to_string_lossy().into_owned());
        self.set_paths(project, &paths)
    }

    fn is_excluded(&self, folder: &Resource) -> bool {
        folder
            .full_path
            .components()
            .any(|segment| segment.as_os_str() == self.layout.excluded_segment.as_str())
    }

    fn is_path_candidate(&self, project: &Project, resource: &Resource) -> bool {
        if resource.linked || self.layout.is_reserved_folder(&resource.name) {
            return false;
        }
        !self.is_external_sources(project, &resource.project_path())
    }

    fn is_external_sources(&self, project: &Project, path: &Path) -> bool {
        let key = self.layout.external_sources_property.as_str();
        match self.tree.property(project, path, key) {
            Ok(value) => value.map_or(false, |value| !value.is_empty()),
            Err(err) => {
                log::error!("failed to read property {key} of {}: {err}", path.display());
                false
            }
        }
    }

    /// Puts `new_paths` in front of the current list, dropping duplicates, and
    /// persists the result.
    ///
    /// Relative entries must name an existing folder of the project (or the
    /// project itself); anything else is logged and skipped.
    /// 將新路徑放在目前清單前面並去除重複後寫回。
    pub fn add_to_paths<P: AsRef<Path>>(
        &self,
        project: &Project,
        new_paths: &[P],
    ) -> Result<(), PathsError> {
        let mut merged: Vec<String> = Vec::new();

        for candidate in new_paths {
            let candidate = candidate.as_ref();
            if candidate.is_absolute() {
                let normalized: PathBuf = candidate.components().collect();
                push_unique(&mut merged, normalized.to_string_lossy().into_owned());
                continue;
            }

            let member = make_relative(candidate).and_then(|relative| {
                self.tree
                    .find_member(project, &relative)
                    .filter(Resource::is_container)
                    .map(|resource| (relative, resource))
            });
            let Some((relative, resource)) = member else {
                log::error!(
                    "cannot add {} to the paths of {}: path not found or not a folder",
                    candidate.display(),
                    project.name()
                );
                continue;
            };

            if self.is_path_candidate(project, &resource) {
                let entry = if relative.as_os_str().is_empty() {
                    PROJECT_ROOT_ENTRY.to_string()
                } else {
                    relative.to_string_lossy().into_owned()
                };
                push_unique(&mut merged, entry);
            }
        }

        let current = self.persisted_paths(project).unwrap_or_default();
        for entry in current {
            push_unique(&mut merged, entry);
        }

        self.set_paths(project, &merged)
    }

    /// True for an existing project folder (see [`Self::is_relative_path`]) or an
    /// existing directory anywhere on disk.
    pub fn is_valid_path(&self, project: &Project, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        if self.is_relative_path(project, path) {
            return true;
        }
        Path::new(path).is_dir()
    }

    /// True when `path`, with any root stripped, names an existing folder of the
    /// project or the project itself.
    /// 去除根目錄後若指向專案內既有資料夾（或專案本身）則為真。
    pub fn is_relative_path(&self, project: &Project, path: &str) -> bool {
        make_relative(Path::new(path))
            .and_then(|relative| self.tree.find_member(project, &relative))
            .map_or(false, |resource| resource.is_container())
    }
}

fn push_unique(list: &mut Vec<String>, entry: String) {
    if !list.contains(&entry) {
        list.push(entry);
    }
}

fn absolute_location(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
