//! Document access through the `defaults` tool, optionally as another user.
//!
//! The preference daemon caches dock documents, so on macOS a document is
//! read and written through `defaults export/import` rather than on disk.
//! When running as root against another user's document the command runs
//! as that user via `sudo -u`.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use plist::Dictionary;

use crate::io::plist_io::{self, DocumentCodec};
use crate::io::store::StoreError;

const DEFAULTS: &str = "/usr/bin/defaults";
const SUDO: &str = "/usr/bin/sudo";

/// `defaults export/import`, optionally run as `run_as`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsCodec {
    pub run_as: Option<u32>,
}

impl DefaultsCodec {
    fn command(&self, args: &[&str]) -> Command {
        match self.run_as {
            Some(uid) => {
                let mut cmd = Command::new(SUDO);
                cmd.arg("-u").arg(format!("#{}", uid)).arg(DEFAULTS).args(args);
                cmd
            }
            None => {
                let mut cmd = Command::new(DEFAULTS);
                cmd.args(args);
                cmd
            }
        }
    }

    /// Export a domain or document path as plist bytes
    pub fn export(&self, target: &str) -> Result<Vec<u8>, StoreError> {
        capture(self.command(&["export", target, "-"]))
    }

    /// Replace a domain or document path with the given dictionary
    pub fn import(&self, target: &str, root: &Dictionary) -> Result<(), StoreError> {
        let bytes = plist_io::encode_binary(root).map_err(|e| StoreError::DocumentUnwritable {
            path: target.into(),
            reason: e.to_string(),
        })?;
        feed(self.command(&["import", target, "-"]), &bytes)
    }
}

impl DocumentCodec for DefaultsCodec {
    fn load(&self, path: &Path) -> Result<Dictionary, StoreError> {
        let target = path.to_string_lossy();
        let bytes = self.export(&target).map_err(|e| StoreError::DocumentUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        plist_io::decode(&bytes, path)
    }

    fn save(&self, path: &Path, root: &Dictionary) -> Result<(), StoreError> {
        let target = path.to_string_lossy();
        self.import(&target, root)
            .map_err(|e| StoreError::DocumentUnwritable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Run to completion and return stdout
pub fn capture(mut cmd: Command) -> Result<Vec<u8>, StoreError> {
    let program = program_name(&cmd);
    tracing::debug!(?cmd, "running");
    let output = cmd
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| StoreError::Subprocess {
            program: program.clone(),
            reason: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(StoreError::Subprocess {
            program,
            reason: output.status.to_string(),
        });
    }
    Ok(output.stdout)
}

/// Run to completion with `input` on stdin
pub fn feed(mut cmd: Command, input: &[u8]) -> Result<(), StoreError> {
    let program = program_name(&cmd);
    tracing::debug!(?cmd, bytes = input.len(), "running");
    let subprocess_err = |e: std::io::Error| StoreError::Subprocess {
        program: program.clone(),
        reason: e.to_string(),
    };
    let mut child = cmd
        .stdin(Stdio::piped())
        .spawn()
        .map_err(subprocess_err)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).map_err(subprocess_err)?;
    }
    let status = child.wait().map_err(subprocess_err)?;
    if status.success() {
        Ok(())
    } else {
        Err(StoreError::Subprocess {
            program,
            reason: status.to_string(),
        })
    }
}
