use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::resource::{Project, Resource, ResourceError, ResourceTree};
use crate::util::{portable_string, write_atomic};

/// File inside a project listing the projects it references.
pub const PROJECT_DESCRIPTOR: &str = ".camlproject";

const SETTINGS_DIR: &str = ".settings";
const PROPERTIES_FILE: &str = "camlpad.resources.json";

/// Project descriptor persisted as JSON at the project root.
/// 專案描述檔，記錄參照的其他專案。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    #[serde(default)]
    pub references: Vec<String>,
}

impl ProjectDescriptor {
    /// Loads the descriptor of the project at `location`; a missing file means no references.
    /// 載入專案描述；檔案不存在時視為沒有參照。
    pub fn load(location: &Path) -> Result<Self, ResourceError> {
        let path = location.join(PROJECT_DESCRIPTOR);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|err| ResourceError::InvalidDescriptor {
                    path,
                    reason: err.to_string(),
                })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ResourceError::io(path, err)),
        }
    }

    pub fn save(&self, location: &Path) -> Result<(), ResourceError> {
        let path = location.join(PROJECT_DESCRIPTOR);
        let payload =
            serde_json::to_vec_pretty(self).map_err(|err| ResourceError::InvalidDescriptor {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        write_atomic(&path, &payload).map_err(|err| ResourceError::io(path, err))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PropertyFile {
    #[serde(default)]
    resources: BTreeMap<String, BTreeMap<String, String>>,
}

/// Resource tree backed by a workspace directory whose sub-directories are projects.
///
/// Links are symbolic links and resource properties live in a JSON file under
/// each project's `.settings` folder.
/// 以工作區目錄實作的資源樹：子目錄即專案，連結使用符號連結。
#[derive(Debug, Clone)]
pub struct FsResourceTree {
    root: PathBuf,
}

impl FsResourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens the project stored in the sub-directory `name`.
    pub fn project(&self, name: &str) -> Result<Project, ResourceError> {
        let location = self.root.join(name);
        if name.is_empty() || !location.is_dir() {
            return Err(ResourceError::ProjectNotFound(name.to_string()));
        }
        Ok(Project::new(name, location))
    }

    fn properties_path(project: &Project) -> PathBuf {
        project.location().join(SETTINGS_DIR).join(PROPERTIES_FILE)
    }

    fn load_properties(project: &Project) -> Result<PropertyFile, ResourceError> {
        let path = Self::properties_path(project);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|err| ResourceError::InvalidProperties {
                    path,
                    reason: err.to_string(),
                })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PropertyFile::default()),
            Err(err) => Err(ResourceError::io(path, err)),
        }
    }

    fn save_properties(project: &Project, file: &PropertyFile) -> Result<(), ResourceError> {
        let path = Self::properties_path(project);
        let payload =
            serde_json::to_vec_pretty(file).map_err(|err| ResourceError::InvalidProperties {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        write_atomic(&path, &payload).map_err(|err| ResourceError::io(path, err))
    }
}

impl ResourceTree for FsResourceTree {
    fn referenced_projects(&self, project: &Project) -> Result<Vec<Project>, ResourceError> {
        let descriptor = ProjectDescriptor::load(project.location())?;
        let mut referenced = Vec::with_capacity(descriptor.references.len());
        for name in descriptor.references {
            match self.project(&name) {
                Ok(reference) => referenced.push(reference),
                Err(err) => log::warn!("project {} references {name}: {err}", project.name()),
            }
        }
        Ok(referenced)
    }

    fn project_folders(&self, project: &Project) -> Result<Vec<Resource>, ResourceError> {
        if !project.location().is_dir() {
            return Err(ResourceError::ProjectNotFound(project.name().to_string()));
        }

        let mut folders = Vec::new();
        for entry in WalkDir::new(project.location())
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("failed to read entry of project {}: {err}", project.name());
                    continue;
                }
            };

            let linked = entry.path_is_symlink();
            let is_dir = if linked {
                entry.path().is_dir()
            } else {
                entry.file_type().is_dir()
            };
            if !is_dir {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(project.location()) {
                folders.push(Resource::folder(project, relative, linked));
            }
        }
        Ok(folders)
    }

    fn find_member(&self, project: &Project, path: &Path) -> Option<Resource> {
        if path.as_os_str().is_empty() {
            return project
                .location()
                .is_dir()
                .then(|| Resource::project(project));
        }

        let full = project.location().join(path);
        let meta = fs::symlink_metadata(&full).ok()?;
        let linked = meta.file_type().is_symlink();
        let meta = if linked { fs::metadata(&full).ok()? } else { meta };

        if meta.is_dir() {
            Some(Resource::folder(project, path, linked))
        } else if meta.is_file() {
            Some(Resource::file(project, path, linked))
        } else {
            None
        }
    }

    fn create_folder(&self, project: &Project, path: &Path) -> Result<(), ResourceError> {
        let full = project.location().join(path);
        fs::create_dir_all(&full).map_err(|err| ResourceError::io(full, err))
    }

    fn property(
        &self,
        project: &Project,
        path: &Path,
        key: &str,
    ) -> Result<Option<String>, ResourceError> {
        let file = Self::load_properties(project)?;
        Ok(file
            .resources
            .get(&portable_string(path))
            .and_then(|properties| properties.get(key))
            .cloned())
    }

    fn set_property(
        &self,
        project: &Project,
        path: &Path,
        key: &str,
        value: &str,
    ) -> Result<(), ResourceError> {
        let mut file = Self::load_properties(project)?;
        file.resources
            .entry(portable_string(path))
            .or_default()
            .insert(key.to_string(), value.to_string());
        Self::save_properties(project, &file)
    }

    fn validate_link_location(
        &self,
        project: &Project,
        link: &Path,
        target: &Path,
    ) -> Result<(), ResourceError> {
        if !target.is_absolute() {
            return Err(ResourceError::invalid_link(target, "target must be absolute"));
        }
        if !target.exists() {
            return Err(ResourceError::invalid_link(target, "target does not exist"));
        }
        if target.starts_with(project.location()) {
            return Err(ResourceError::invalid_link(
                target,
                "target overlaps the project location",
            ));
        }
        let occupied = fs::symlink_metadata(project.location().join(link))
            .map(|meta| !meta.file_type().is_symlink())
            .unwrap_or(false);
        if occupied {
            return Err(ResourceError::invalid_link(
                target,
                format!("{} is already used by a resource", link.display()),
            ));
        }
        Ok(())
    }

    fn create_link(
        &self,
        project: &Project,
        link: &Path,
        target: &Path,
    ) -> Result<(), ResourceError> {
        let full = project.location().join(link);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|err| ResourceError::io(parent, err))?;
        }
        if let Ok(meta) = fs::symlink_metadata(&full) {
            if meta.file_type().is_symlink() {
                fs::remove_file(&full).map_err(|err| ResourceError::io(&full, err))?;
            }
        }
        symlink_file(target, &full).map_err(|err| ResourceError::io(full, err))
    }
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_file(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "links are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use tempfile::tempdir;

    fn workspace_with_project(name: &str) -> (tempfile::TempDir, FsResourceTree, Project) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(name)).unwrap();
        let tree = FsResourceTree::new(dir.path());
        let project = tree.project(name).unwrap();
        (dir, tree, project)
    }

    #[test]
    fn missing_project_is_reported() {
        let dir = tempdir().unwrap();
        let tree = FsResourceTree::new(dir.path());
        assert!(matches!(
            tree.project("absent"),
            Err(ResourceError::ProjectNotFound(name)) if name == "absent"
        ));
    }

    #[test]
    fn descriptor_defaults_to_no_references() {
        let (_dir, tree, project) = workspace_with_project("app");
        assert!(tree.referenced_projects(&project).unwrap().is_empty());
    }

    #[test]
    fn referenced_projects_skip_missing_entries() {
        let (dir, tree, project) = workspace_with_project("app");
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        ProjectDescriptor {
            references: vec!["lib".into(), "ghost".into()],
        }
        .save(project.location())
        .unwrap();

        let referenced = tree.referenced_projects(&project).unwrap();
        assert_eq!(referenced.len(), 1);
        assert_eq!(referenced[0].name(), "lib");
        assert_eq!(referenced[0].location(), dir.path().join("lib"));
    }

    #[test]
    fn project_folders_are_nested_and_sorted() {
        let (_dir, tree, project) = workspace_with_project("app");
        fs::create_dir_all(project.location().join("src").join("core")).unwrap();
        fs::create_dir_all(project.location().join("doc")).unwrap();
        fs::write(project.location().join("main.ml"), "let () = ()").unwrap();

        let folders: Vec<PathBuf> = tree
            .project_folders(&project)
            .unwrap()
            .into_iter()
            .map(|folder| folder.full_path)
            .collect();
        assert_eq!(
            folders,
            vec![
                Path::new("app").join("doc"),
                Path::new("app").join("src"),
                Path::new("app").join("src").join("core"),
            ]
        );
    }

    #[test]
    fn find_member_reports_kinds() {
        let (_dir, tree, project) = workspace_with_project("app");
        fs::create_dir_all(project.location().join("src")).unwrap();
        fs::write(project.location().join("src").join("a.ml"), "").unwrap();

        let root = tree.find_member(&project, Path::new("")).unwrap();
        assert_eq!(root.kind, ResourceKind::Project);
        let folder = tree.find_member(&project, Path::new("src")).unwrap();
        assert_eq!(folder.kind, ResourceKind::Folder);
        let file = tree
            .find_member(&project, &Path::new("src").join("a.ml"))
            .unwrap();
        assert_eq!(file.kind, ResourceKind::File);
        assert!(tree.find_member(&project, Path::new("nope")).is_none());
    }

    #[test]
    fn properties_survive_reload() {
        let (dir, tree, project) = workspace_with_project("app");
        let folder = Path::new(".DebuggerSourceLookup");
        tree.create_folder(&project, folder).unwrap();
        tree.set_property(&project, folder, "marker", "true").unwrap();

        let reopened = FsResourceTree::new(dir.path());
        assert_eq!(
            reopened.property(&project, folder, "marker").unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(reopened.property(&project, folder, "other").unwrap(), None);
    }

    #[test]
    fn link_validation_rejects_targets_inside_project() {
        let (_dir, tree, project) = workspace_with_project("app");
        let inside = project.location().join("x.ml");
        fs::write(&inside, "").unwrap();

        let err = tree
            .validate_link_location(&project, Path::new("links/x.ml"), &inside)
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidLink { .. }));
        assert!(tree
            .validate_link_location(&project, Path::new("links/y.ml"), Path::new("y.ml"))
            .is_err());
    }

    #[cfg(unix)]
    #[test]
    fn create_link_replaces_existing_link() {
        let (dir, tree, project) = workspace_with_project("app");
        let external = dir.path().join("external");
        fs::create_dir_all(&external).unwrap();
        let first = external.join("first.ml");
        let second = external.join("second.ml");
        fs::write(&first, "").unwrap();
        fs::write(&second, "").unwrap();

        let link = Path::new("links").join("x.ml");
        tree.validate_link_location(&project, &link, &first).unwrap();
        tree.create_link(&project, &link, &first).unwrap();
        tree.validate_link_location(&project, &link, &second).unwrap();
        tree.create_link(&project, &link, &second).unwrap();

        let target = fs::read_link(project.location().join(&link)).unwrap();
        assert_eq!(target, second);
        let member = tree.find_member(&project, &link).unwrap();
        assert!(member.linked);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_folders_are_reported_as_linked() {
        let (dir, tree, project) = workspace_with_project("app");
        let external = dir.path().join("shared");
        fs::create_dir_all(external.join("nested")).unwrap();
        std::os::unix::fs::symlink(&external, project.location().join("shared")).unwrap();

        let folders = tree.project_folders(&project).unwrap();
        assert_eq!(folders.len(), 1);
        assert!(folders[0].linked);
        assert_eq!(folders[0].name, "shared");
    }
}
