use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::io::store::StoreError;

/// Preference domain of the dock
pub const DOCK_DOMAIN: &str = "com.apple.dock";
/// Location of the dock document relative to a home directory
pub const DOCK_PLIST: &str = "Library/Preferences/com.apple.dock.plist";

/// A user account from the passwd database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub home: PathBuf,
}

/// Identity questions asked when choosing how to persist a document
pub trait Session {
    /// The user logged in at the console, if any
    fn console_user(&self) -> Option<Account>;
    /// Effective uid of this process
    fn current_uid(&self) -> u32;
    /// Home directory of the invoking user
    fn home_dir(&self) -> Option<PathBuf>;
}

/// The dock document inside a home directory
pub fn dock_document(home: &Path) -> PathBuf {
    home.join(DOCK_PLIST)
}

/// Is `path` the console user's own dock document?
pub fn is_console_document(session: &dyn Session, path: &Path) -> bool {
    session
        .console_user()
        .is_some_and(|account| dock_document(&account.home) == path)
}

/// Does `path` belong to the live session we are running as? Only then can
/// the preference store be edited directly.
pub fn is_live_document(session: &dyn Session, path: &Path) -> bool {
    match session.console_user() {
        Some(account) => {
            dock_document(&account.home) == path && account.uid == session.current_uid()
        }
        None => false,
    }
}

/// The real machine: console owner, process uid, passwd lookups
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSession;

impl Session for SystemSession {
    #[cfg(target_os = "macos")]
    fn console_user(&self) -> Option<Account> {
        use std::os::unix::fs::MetadataExt;
        // /dev/console is owned by whoever is logged in at the GUI
        let uid = std::fs::metadata("/dev/console").ok()?.uid();
        if uid == 0 {
            return None;
        }
        account_for_uid(uid)
    }

    #[cfg(not(target_os = "macos"))]
    fn console_user(&self) -> Option<Account> {
        None
    }

    fn current_uid(&self) -> u32 {
        unsafe { libc::geteuid() }
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

/// Look up an account by uid
pub fn account_for_uid(uid: u32) -> Option<Account> {
    // SAFETY: getpwuid returns a pointer to static storage or null; the
    // strings are copied out before any other passwd call can reuse it.
    unsafe {
        let pw = libc::getpwuid(uid as libc::uid_t);
        if pw.is_null() {
            return None;
        }
        let name = CStr::from_ptr((*pw).pw_name).to_string_lossy().into_owned();
        let home = CStr::from_ptr((*pw).pw_dir).to_string_lossy().into_owned();
        Some(Account {
            name,
            uid,
            home: PathBuf::from(home),
        })
    }
}

/// Ways to make a running dock pick up a rewritten document
pub trait SessionSignal {
    /// Ask the dock to reload its preferences
    fn request_reload(&self) -> Result<(), StoreError>;
    /// Kill and relaunch the dock agent
    fn force_restart(&self) -> Result<(), StoreError>;
}

/// Signals delivered through `notifyutil` and `launchctl` to a user's GUI
/// session
#[derive(Debug, Clone, Copy)]
pub struct LaunchdSignal {
    pub uid: u32,
}

impl SessionSignal for LaunchdSignal {
    fn request_reload(&self) -> Result<(), StoreError> {
        run_status("/usr/bin/notifyutil", &["-p", "com.apple.dock.prefchanged"])
    }

    fn force_restart(&self) -> Result<(), StoreError> {
        let service = format!("gui/{}/com.apple.Dock.agent", self.uid);
        run_status("/bin/launchctl", &["kickstart", "-k", &service])
    }
}

fn run_status(program: &str, args: &[&str]) -> Result<(), StoreError> {
    tracing::debug!(program, ?args, "running");
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| StoreError::Subprocess {
            program: program.to_string(),
            reason: e.to_string(),
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(StoreError::Subprocess {
            program: program.to_string(),
            reason: status.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A session with a fixed console user and process uid
    pub(crate) struct FakeSession {
        pub console: Option<Account>,
        pub uid: u32,
    }

    impl Session for FakeSession {
        fn console_user(&self) -> Option<Account> {
            self.console.clone()
        }
        fn current_uid(&self) -> u32 {
            self.uid
        }
        fn home_dir(&self) -> Option<PathBuf> {
            self.console.as_ref().map(|a| a.home.clone())
        }
    }

    pub(crate) fn alice() -> Account {
        Account {
            name: "alice".into(),
            uid: 501,
            home: PathBuf::from("/Users/alice"),
        }
    }

    #[test]
    fn test_live_document_requires_same_identity() {
        let path = PathBuf::from("/Users/alice/Library/Preferences/com.apple.dock.plist");
        let as_alice = FakeSession {
            console: Some(alice()),
            uid: 501,
        };
        let as_root = FakeSession {
            console: Some(alice()),
            uid: 0,
        };
        assert!(is_live_document(&as_alice, &path));
        assert!(!is_live_document(&as_root, &path));
        assert!(is_console_document(&as_root, &path));
    }

    #[test]
    fn test_other_users_document_is_not_live() {
        let path = PathBuf::from("/Users/bob/Library/Preferences/com.apple.dock.plist");
        let session = FakeSession {
            console: Some(alice()),
            uid: 501,
        };
        assert!(!is_live_document(&session, &path));
        assert!(!is_console_document(&session, &path));
    }

    #[test]
    fn test_no_console_user() {
        let session = FakeSession {
            console: None,
            uid: 501,
        };
        assert!(!is_live_document(&session, Path::new("/tmp/dock.plist")));
    }

    #[test]
    fn test_root_account_lookup() {
        let account = account_for_uid(0).expect("uid 0 has a passwd entry");
        assert_eq!(account.uid, 0);
        assert_eq!(account.name, "root");
    }
}
