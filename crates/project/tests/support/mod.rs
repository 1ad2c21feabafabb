use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use camlpad_project::{Project, Resource, ResourceError, ResourceTree};

/// In-memory resource tree; only the path file and external directories touch disk.
#[derive(Default)]
pub struct MemoryTree {
    folders: RefCell<BTreeMap<(String, PathBuf), bool>>,
    properties: RefCell<HashMap<(String, PathBuf, String), String>>,
    links: RefCell<BTreeMap<(String, PathBuf), PathBuf>>,
    references: RefCell<HashMap<String, Vec<Project>>>,
    rejected_targets: RefCell<Vec<PathBuf>>,
    failing_targets: RefCell<Vec<PathBuf>>,
}

impl MemoryTree {
    pub fn add_folder(&self, project: &Project, path: &str) {
        self.folders
            .borrow_mut()
            .insert((project.name().to_string(), PathBuf::from(path)), false);
    }

    pub fn add_linked_folder(&self, project: &Project, path: &str) {
        self.folders
            .borrow_mut()
            .insert((project.name().to_string(), PathBuf::from(path)), true);
    }

    pub fn add_reference(&self, from: &Project, to: &Project) {
        self.references
            .borrow_mut()
            .entry(from.name().to_string())
            .or_default()
            .push(to.clone());
    }

    pub fn reject_link_target(&self, target: impl Into<PathBuf>) {
        self.rejected_targets.borrow_mut().push(target.into());
    }

    /// Makes `create_link` fail for `target` after validation has passed.
    pub fn fail_link(&self, target: impl Into<PathBuf>) {
        self.failing_targets.borrow_mut().push(target.into());
    }

    pub fn tag(&self, project: &Project, path: &str, key: &str, value: &str) {
        self.properties.borrow_mut().insert(
            (project.name().to_string(), PathBuf::from(path), key.to_string()),
            value.to_string(),
        );
    }

    pub fn tag_of(&self, project: &Project, path: &str, key: &str) -> Option<String> {
        self.properties
            .borrow()
            .get(&(project.name().to_string(), PathBuf::from(path), key.to_string()))
            .cloned()
    }

    pub fn link_target(&self, project: &Project, link: impl AsRef<Path>) -> Option<PathBuf> {
        self.links
            .borrow()
            .get(&(project.name().to_string(), link.as_ref().to_path_buf()))
            .cloned()
    }

    pub fn link_count(&self) -> usize {
        self.links.borrow().len()
    }
}

impl ResourceTree for MemoryTree {
    fn referenced_projects(&self, project: &Project) -> Result<Vec<Project>, ResourceError> {
        Ok(self
            .references
            .borrow()
            .get(project.name())
            .cloned()
            .unwrap_or_default())
    }

    fn project_folders(&self, project: &Project) -> Result<Vec<Resource>, ResourceError> {
        Ok(self
            .folders
            .borrow()
            .iter()
            .filter(|((owner, _), _)| owner == project.name())
            .map(|((_, path), linked)| Resource::folder(project, path, *linked))
            .collect())
    }

    fn find_member(&self, project: &Project, path: &Path) -> Option<Resource> {
        if path.as_os_str().is_empty() {
            return Some(Resource::project(project));
        }
        let key = (project.name().to_string(), path.to_path_buf());
        if let Some(linked) = self.folders.borrow().get(&key) {
            return Some(Resource::folder(project, path, *linked));
        }
        self.links
            .borrow()
            .contains_key(&key)
            .then(|| Resource::file(project, path, true))
    }

    fn create_folder(&self, project: &Project, path: &Path) -> Result<(), ResourceError> {
        self.folders
            .borrow_mut()
            .insert((project.name().to_string(), path.to_path_buf()), false);
        Ok(())
    }

    fn property(
        &self,
        project: &Project,
        path: &Path,
        key: &str,
    ) -> Result<Option<String>, ResourceError> {
        Ok(self
            .properties
            .borrow()
            .get(&(project.name().to_string(), path.to_path_buf(), key.to_string()))
            .cloned())
    }

    fn set_property(
        &self,
        project: &Project,
        path: &Path,
        key: &str,
        value: &str,
    ) -> Result<(), ResourceError> {
        self.properties.borrow_mut().insert(
            (project.name().to_string(), path.to_path_buf(), key.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    fn validate_link_location(
        &self,
        _project: &Project,
        _link: &Path,
        target: &Path,
    ) -> Result<(), ResourceError> {
        if self.rejected_targets.borrow().iter().any(|rejected| rejected == target) {
            return Err(ResourceError::InvalidLink {
                target: target.to_path_buf(),
                reason: "rejected by test".to_string(),
            });
        }
        Ok(())
    }

    fn create_link(
        &self,
        project: &Project,
        link: &Path,
        target: &Path,
    ) -> Result<(), ResourceError> {
        if self.failing_targets.borrow().iter().any(|failing| failing == target) {
            return Err(ResourceError::Io {
                path: link.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.links.borrow_mut().insert(
            (project.name().to_string(), link.to_path_buf()),
            target.to_path_buf(),
        );
        Ok(())
    }
}
