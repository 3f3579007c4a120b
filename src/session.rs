//! The persisted session: bearer token, user identity and the capability
//! map the backend issued at login. Stored as one JSON file, read at
//! startup, removed on logout.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resources;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no session found at {0}, log in first")]
    Missing(String),
    #[error("session grants permissions for unknown resource \"{0}\"")]
    UnknownResource(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: String,
    pub role: String,
    #[serde(default)]
    pub superuser: bool,
    #[serde(default)]
    pub permissions: HashMap<String, Capability>,
}

impl Session {
    pub fn can(&self, resource: &str, action: Action) -> bool {
        if self.superuser {
            return true;
        }
        let Some(cap) = self.permissions.get(resource) else {
            return false;
        };
        match action {
            Action::View => cap.view,
            Action::Create => cap.create,
            Action::Edit => cap.edit,
            Action::Delete => cap.delete,
        }
    }

    /// Reject permission entries for resources this client does not know.
    /// A stale map would otherwise silently grant nothing and confuse
    /// whoever edited the roles on the server.
    fn validate(&self) -> Result<(), SessionError> {
        for key in self.permissions.keys() {
            if !resources::is_known_key(key) {
                return Err(SessionError::UnknownResource(key.clone()));
            }
        }
        Ok(())
    }
}

pub fn load(path: &Path) -> Result<Session, SessionError> {
    if !path.exists() {
        return Err(SessionError::Missing(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let session: Session = serde_json::from_str(&contents)?;
    session.validate()?;
    Ok(session)
}

pub fn save(path: &Path, session: &Session) -> Result<(), SessionError> {
    session.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(session)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Logout: drop the file. Missing file is fine, the outcome is the same.
pub fn clear(path: &Path) -> Result<(), SessionError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        let mut permissions = HashMap::new();
        permissions.insert(
            "products".to_string(),
            Capability {
                view: true,
                create: true,
                edit: false,
                delete: false,
            },
        );
        Session {
            token: "tok-123".into(),
            user: "ada".into(),
            role: "clerk".into(),
            superuser: false,
            permissions,
        }
    }

    #[test]
    fn roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        save(&path, &sample()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.token, "tok-123");
        assert!(loaded.can("products", Action::View));
        assert!(!loaded.can("products", Action::Delete));
    }

    #[test]
    fn missing_file_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SessionError::Missing(_)));
    }

    #[test]
    fn unknown_resource_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut s = sample();
        s.permissions.insert("warehouses".into(), Capability::default());
        std::fs::write(&path, serde_json::to_string(&s).unwrap()).unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, SessionError::UnknownResource(_)));
    }

    #[test]
    fn superuser_bypasses_the_map() {
        let mut s = sample();
        s.superuser = true;
        assert!(s.can("orders", Action::Delete));
    }

    #[test]
    fn unlisted_resource_grants_nothing() {
        let s = sample();
        assert!(!s.can("orders", Action::View));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        save(&path, &sample()).unwrap();
        clear(&path).unwrap();
        clear(&path).unwrap();
        assert!(!path.exists());
    }
}
