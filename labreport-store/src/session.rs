use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use labreport_core::LabError;
use serde::{Deserialize, Serialize};

/// The signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    /// Bearer token, for stores that issue one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Sign-in state persisted to a small JSON file so it survives restarts.
///
/// No credential checks happen here; any non-blank email signs in.
#[derive(Debug)]
pub struct SessionContext {
    path: PathBuf,
    current: Option<Session>,
}

impl SessionContext {
    /// `<config dir>/labreport/session.json`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("labreport").join("session.json"))
    }

    /// Load whatever session was saved at `path`. A missing file means
    /// signed out; an unreadable one is discarded with a warning.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self, LabError> {
        let path = path.into();
        let current = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "ignoring corrupt session file"
                    );
                    None
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(storage_error("reading", &path, err)),
        };
        Ok(Self { path, current })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn sign_in(&mut self, email: &str) -> Result<&Session, LabError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(LabError::Validation("Missing required field: email".into()));
        }

        let session = Session {
            email: email.to_string(),
            token: None,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| storage_error("creating", parent, err))?;
        }
        let raw = serde_json::to_string_pretty(&session)
            .map_err(|err| LabError::Storage(err.to_string()))?;
        fs::write(&self.path, raw).map_err(|err| storage_error("writing", &self.path, err))?;

        tracing::info!(email, "signed in");
        Ok(self.current.insert(session))
    }

    pub fn sign_out(&mut self) -> Result<(), LabError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(storage_error("removing", &self.path, err)),
        }
        if let Some(session) = self.current.take() {
            tracing::info!(email = %session.email, "signed out");
        }
        Ok(())
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> LabError {
    LabError::Storage(format!("{action} {}: {err}", path.display()))
}
