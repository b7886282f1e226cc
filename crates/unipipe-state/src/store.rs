//! Versioned file store — a git working tree holding the instance records.
//!
//! Paths handed to the store are relative to the repository root. Reads go
//! straight to the working tree; `commit_all_changes` stages everything
//! that changed and records it as a single commit.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use git2::{ErrorCode, IndexAddOption, Repository, Signature};
use tracing::{debug, info};

use unipipe_core::GitConfig;

use crate::error::{StateError, StateResult, io_err};

/// A file or directory addressed relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    relative: String,
    path: PathBuf,
}

impl RepoFile {
    pub fn new(root: &Path, relative: &str) -> Self {
        RepoFile {
            relative: relative.to_string(),
            path: root.join(relative),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative
    }

    /// Location in the working tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn last_modified(&self) -> StateResult<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(io_err!(&self.path))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum EntryKind {
    File,
    Dir,
}

/// Storage seam used by the repository: path resolution, listings, and
/// "commit everything" as one unit of history.
pub trait VersionedFileStore {
    /// Root of the working tree.
    fn root(&self) -> &Path;

    /// Stage every uncommitted change and create one commit.
    ///
    /// Returns the new commit id, or `None` when there was nothing to
    /// commit.
    fn commit_all_changes(&self, message: &str) -> StateResult<Option<String>>;

    fn file_at(&self, relative: &str) -> RepoFile {
        RepoFile::new(self.root(), relative)
    }

    /// Regular files directly inside `relative_dir`, sorted by name.
    /// Empty if the directory does not exist.
    fn files_in(&self, relative_dir: &str) -> StateResult<Vec<RepoFile>> {
        list_entries(self.root(), relative_dir, EntryKind::File)
    }

    /// Sub-directories directly inside `relative_dir`, sorted by name.
    /// Empty if the directory does not exist.
    fn dirs_in(&self, relative_dir: &str) -> StateResult<Vec<RepoFile>> {
        list_entries(self.root(), relative_dir, EntryKind::Dir)
    }
}

fn list_entries(root: &Path, relative_dir: &str, kind: EntryKind) -> StateResult<Vec<RepoFile>> {
    let dir = root.join(relative_dir);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StateError::io(&dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err!(&dir))?;
        let file_type = entry.file_type().map_err(io_err!(entry.path()))?;
        let matches = match kind {
            EntryKind::File => file_type.is_file(),
            EntryKind::Dir => file_type.is_dir(),
        };
        if !matches {
            continue;
        }
        // Non UTF-8 names cannot be instance ids or batch files.
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .map(|name| RepoFile::new(root, &format!("{relative_dir}/{name}")))
        .collect())
}

/// Git-backed store. Each call re-opens the repository so that no state
/// is held between operations.
#[derive(Debug, Clone)]
pub struct GitHandler {
    root: PathBuf,
    author_name: String,
    author_email: String,
}

impl GitHandler {
    /// Open the repository at `config.local_path`, initializing a new one
    /// if none exists yet.
    pub fn open_or_init(config: &GitConfig) -> StateResult<Self> {
        let path = &config.local_path;
        let existing = if path.exists() {
            match Repository::open(path) {
                Ok(repo) => Some(repo),
                Err(e) if e.code() == ErrorCode::NotFound => None,
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };
        let repo = match existing {
            Some(repo) => repo,
            None => {
                fs::create_dir_all(path).map_err(io_err!(path))?;
                let repo = Repository::init(path)?;
                info!(path = %path.display(), "initialized instance repository");
                repo
            }
        };
        debug!(path = %path.display(), bare = repo.is_bare(), "instance repository opened");
        Ok(GitHandler {
            root: path.clone(),
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
        })
    }
}

impl VersionedFileStore for GitHandler {
    fn root(&self) -> &Path {
        &self.root
    }

    fn commit_all_changes(&self, message: &str) -> StateResult<Option<String>> {
        let repo = Repository::open(&self.root)?;

        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        // Picks up removals that add_all leaves in the index.
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let tree = repo.find_tree(tree_id)?;
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => tree.is_empty(),
        };
        if unchanged {
            debug!(commit_message = message, "nothing to commit");
            return Ok(None);
        }

        let signature = Signature::now(&self.author_name, &self.author_email)?;
        let parents: Vec<_> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        let id = oid.to_string();
        info!(commit = %&id[..7], commit_message = message, "committed changes");
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(dir: &Path) -> GitHandler {
        GitHandler::open_or_init(&GitConfig {
            local_path: dir.to_path_buf(),
            ..GitConfig::default()
        })
        .unwrap()
    }

    fn commit_count(root: &Path) -> usize {
        let repo = Repository::open(root).unwrap();
        let mut walk = repo.revwalk().unwrap();
        if walk.push_head().is_err() {
            return 0;
        }
        walk.count()
    }

    #[test]
    fn open_or_init_creates_repository() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("repo");

        let store = handler(&target);

        assert!(target.join(".git").exists());
        assert_eq!(commit_count(store.root()), 0);
    }

    #[test]
    fn commit_bundles_all_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = handler(dir.path());
        fs::create_dir_all(dir.path().join("instances/a")).unwrap();
        fs::write(dir.path().join("instances/a/instance.yml"), "x: 1\n").unwrap();
        fs::write(dir.path().join("instances/a/status.yml"), "y: 2\n").unwrap();

        let id = store.commit_all_changes("first").unwrap();

        assert!(id.is_some());
        assert_eq!(commit_count(dir.path()), 1);
        let repo = Repository::open(dir.path()).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.message(), Some("first"));
        let tree = head.tree().unwrap();
        assert!(tree.get_path(Path::new("instances/a/instance.yml")).is_ok());
        assert!(tree.get_path(Path::new("instances/a/status.yml")).is_ok());
    }

    #[test]
    fn commit_without_changes_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = handler(dir.path());

        assert_eq!(store.commit_all_changes("empty").unwrap(), None);

        fs::write(dir.path().join("a.yml"), "a: 1\n").unwrap();
        assert!(store.commit_all_changes("one").unwrap().is_some());
        assert_eq!(store.commit_all_changes("again").unwrap(), None);
        assert_eq!(commit_count(dir.path()), 1);
    }

    #[test]
    fn commit_records_deletions() {
        let dir = tempfile::tempdir().unwrap();
        let store = handler(dir.path());
        fs::write(dir.path().join("a.yml"), "a: 1\n").unwrap();
        fs::write(dir.path().join("b.yml"), "b: 1\n").unwrap();
        store.commit_all_changes("add").unwrap();

        fs::remove_file(dir.path().join("a.yml")).unwrap();
        assert!(store.commit_all_changes("remove").unwrap().is_some());

        let repo = Repository::open(dir.path()).unwrap();
        let tree = repo.head().unwrap().peel_to_tree().unwrap();
        assert!(tree.get_path(Path::new("a.yml")).is_err());
        assert!(tree.get_path(Path::new("b.yml")).is_ok());
    }

    #[test]
    fn reopen_existing_repository() {
        let dir = tempfile::tempdir().unwrap();
        let store = handler(dir.path());
        fs::write(dir.path().join("a.yml"), "a: 1\n").unwrap();
        store.commit_all_changes("add").unwrap();

        let reopened = handler(dir.path());
        assert_eq!(commit_count(reopened.root()), 1);
    }

    #[test]
    fn listings_are_sorted_and_typed() {
        let dir = tempfile::tempdir().unwrap();
        let store = handler(dir.path());
        fs::create_dir_all(dir.path().join("instances/b")).unwrap();
        fs::create_dir_all(dir.path().join("instances/a")).unwrap();
        fs::write(dir.path().join("instances/README.yml"), "").unwrap();

        let dirs = store.dirs_in("instances").unwrap();
        let names: Vec<_> = dirs.iter().map(|d| d.relative_path()).collect();
        assert_eq!(names, vec!["instances/a", "instances/b"]);

        let files = store.files_in("instances").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), Some("README.yml"));
    }

    #[test]
    fn listing_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = handler(dir.path());
        assert!(store.dirs_in("instances").unwrap().is_empty());
        assert!(store.files_in("instances/nope").unwrap().is_empty());
    }

    #[test]
    fn repo_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = handler(dir.path());
        let file = store.file_at("instances/x/instance.yml");

        assert_eq!(file.path(), dir.path().join("instances/x/instance.yml"));
        assert!(!file.exists());
        assert!(file.last_modified().is_err());

        fs::create_dir_all(dir.path().join("instances/x")).unwrap();
        fs::write(file.path(), "a: 1\n").unwrap();
        assert!(file.exists());
        assert!(file.last_modified().is_ok());
    }
}
