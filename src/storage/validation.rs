//! Path validation
//!
//! Turns host-supplied path strings into validated, normalized references.

use std::fmt;

use crate::error::ValidationError;

/// A validated absolute path inside the store.
///
/// Always starts with `/`, never contains empty, `.` or `..` components and
/// never ends with a separator unless it is the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRef(String);

impl FileRef {
    /// Validate and normalize `path`.
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        if path.is_empty() || !path.starts_with('/') {
            return Err(ValidationError::RelativePath(path.to_string()));
        }
        if path.contains('\0') {
            return Err(ValidationError::InvalidPath(path.escape_default().to_string()));
        }

        let mut components = Vec::new();
        for component in path.split('/') {
            match component {
                "" | "." => continue,
                ".." => return Err(ValidationError::InvalidPath(path.to_string())),
                name => components.push(name),
            }
        }

        Ok(FileRef(format!("/{}", components.join("/"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Parent directory, `None` for the root.
    pub fn parent(&self) -> Option<FileRef> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(FileRef("/".to_string())),
            Some(idx) => Some(FileRef(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Final component, empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Path relative to the store root, without the leading separator.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    /// True when `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &FileRef) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
