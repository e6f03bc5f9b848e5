use std::fs;
use std::path::{Path, PathBuf};

use crate::io::session::{DOCK_PLIST, dock_document};

/// Error type for turning command-line targets into dock documents
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("{0} does not seem to be a home directory or a dock plist")]
    InvalidTarget(PathBuf),
    #[error("no dock plists were found")]
    HomeDirectoryUnresolvable,
}

/// Turn one target argument into an existing dock document path.
///
/// `~` and `~/` mean `home`, a directory means the dock document inside it,
/// and relative paths are taken from `cwd`.
pub fn resolve_target(arg: &str, cwd: &Path, home: Option<&Path>) -> Result<PathBuf, TargetError> {
    let mut path = match (arg, home) {
        ("~" | "~/", Some(home)) => home.to_path_buf(),
        _ => PathBuf::from(arg),
    };
    if path.is_relative() {
        path = cwd.join(path);
    }
    if path.is_dir() {
        tracing::debug!(path = %path.display(), "target is a directory");
        path = dock_document(&path);
    }
    if !path.is_file() {
        return Err(TargetError::InvalidTarget(path));
    }
    Ok(path)
}

/// Dock documents of every home under `homeloc` that has a
/// `Library/Preferences` directory. The documents themselves need not exist.
pub fn scan_homes(homeloc: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(homeloc) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(homeloc = %homeloc.display(), error = %e, "could not list homes");
            return Vec::new();
        }
    };
    let mut homes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|home| home.join("Library/Preferences").is_dir())
        .collect();
    homes.sort();
    homes.iter().map(|home| dock_document(home)).collect()
}

/// Build the ordered, de-duplicated list of documents to process.
///
/// `own` is the invoking user's document, used only when no explicit target
/// was given. With `allhomes` the documents under that location are added.
pub fn collect_targets(
    explicit: &[String],
    own: Option<PathBuf>,
    allhomes: Option<&Path>,
) -> Result<Vec<String>, TargetError> {
    let mut targets: Vec<String> = explicit.to_vec();
    if targets.is_empty() {
        if let Some(own) = own {
            targets.push(own.to_string_lossy().into_owned());
        }
    }
    if let Some(homeloc) = allhomes {
        targets.extend(
            scan_homes(homeloc)
                .into_iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );
    }

    let mut seen = std::collections::HashSet::new();
    targets.retain(|t| seen.insert(t.clone()));

    if targets.is_empty() {
        return Err(TargetError::HomeDirectoryUnresolvable);
    }
    Ok(targets)
}

/// The home directory a dock document belongs to, used to expand `~` in
/// additions
pub fn home_of_document(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(&format!("/{}", DOCK_PLIST)) {
        Some(home) => PathBuf::from(home),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn make_home(root: &Path, name: &str, with_doc: bool) -> PathBuf {
        let home = root.join(name);
        fs::create_dir_all(home.join("Library/Preferences")).unwrap();
        if with_doc {
            fs::write(dock_document(&home), b"").unwrap();
        }
        home
    }

    #[test]
    fn test_resolve_directory_target() {
        let tmp = TempDir::new().unwrap();
        let home = make_home(tmp.path(), "alice", true);
        let resolved = resolve_target(home.to_str().unwrap(), tmp.path(), None).unwrap();
        assert_eq!(resolved, dock_document(&home));
    }

    #[test]
    fn test_resolve_tilde_and_relative() {
        let tmp = TempDir::new().unwrap();
        let home = make_home(tmp.path(), "alice", true);
        assert_eq!(
            resolve_target("~", tmp.path(), Some(&home)).unwrap(),
            dock_document(&home)
        );
        assert_eq!(
            resolve_target("alice", tmp.path(), None).unwrap(),
            dock_document(&home)
        );
    }

    #[test]
    fn test_resolve_missing_document_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let home = make_home(tmp.path(), "bob", false);
        let err = resolve_target(home.to_str().unwrap(), tmp.path(), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "{} does not seem to be a home directory or a dock plist",
                dock_document(&home).display()
            )
        );
    }

    #[test]
    fn test_scan_homes_requires_preferences_dir() {
        let tmp = TempDir::new().unwrap();
        make_home(tmp.path(), "carol", false);
        make_home(tmp.path(), "alice", true);
        fs::create_dir_all(tmp.path().join("Shared")).unwrap();

        let found = scan_homes(tmp.path());
        assert_eq!(
            found,
            vec![
                dock_document(&tmp.path().join("alice")),
                dock_document(&tmp.path().join("carol")),
            ]
        );
    }

    #[test]
    fn test_collect_targets_dedups_and_prefers_explicit() {
        let tmp = TempDir::new().unwrap();
        let alice = make_home(tmp.path(), "alice", true);
        let alice_doc = dock_document(&alice).to_string_lossy().into_owned();

        let own = Some(PathBuf::from("/own/dock.plist"));
        let explicit = vec![alice_doc.clone()];
        let targets = collect_targets(&explicit, own.clone(), Some(tmp.path())).unwrap();
        assert_eq!(targets, vec![alice_doc.clone()]);

        let targets = collect_targets(&[], own, Some(tmp.path())).unwrap();
        assert_eq!(targets, vec!["/own/dock.plist".to_string(), alice_doc]);
    }

    #[test]
    fn test_collect_targets_nothing_found() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            collect_targets(&[], None, Some(tmp.path())),
            Err(TargetError::HomeDirectoryUnresolvable)
        ));
    }

    #[test]
    fn test_home_of_document() {
        assert_eq!(
            home_of_document(Path::new(
                "/Users/alice/Library/Preferences/com.apple.dock.plist"
            )),
            PathBuf::from("/Users/alice")
        );
        assert_eq!(
            home_of_document(Path::new("/tmp/custom/dock.plist")),
            PathBuf::from("/tmp/custom")
        );
    }
}
