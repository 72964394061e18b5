//! Shared data model (§3 of the spec). Plain records; no behavior.

use std::collections::HashMap;

use chrono::{DateTime, Local};

/// One path reported by `svn log --verbose` for the target revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPath {
    pub path: String,
    pub action: Action,
    pub copy_from_path: Option<String>,
    pub copy_from_rev: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Delete,
    Modify,
    Replace,
}

impl Action {
    pub fn from_svn_code(code: &str) -> crate::error::Result<Self> {
        match code {
            "A" => Ok(Action::Add),
            "D" => Ok(Action::Delete),
            "M" => Ok(Action::Modify),
            "R" => Ok(Action::Replace),
            other => Err(crate::error::ParseError::SvnProtocolError(format!(
                "unknown path action code '{other}'"
            ))),
        }
    }
}

/// The decoded `svn log --verbose --xml --limit 1` result for one revision.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub revision: i64,
    pub author: String,
    pub date: Option<DateTime<Local>>,
    pub message: String,
    pub paths: Vec<RawPath>,
}

/// Identifies a point in repository history for a kind/list query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub path: String,
    pub revision: i64,
}

/// The resolver's file/directory classification, plus the synthetic
/// `DELETED` meaning "not present at the lookup point."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Deleted,
}

impl FileKind {
    pub fn from_svn_kind(kind: &str) -> crate::error::Result<Self> {
        match kind {
            "file" => Ok(FileKind::File),
            "dir" => Ok(FileKind::Directory),
            other => Err(crate::error::ParseError::SvnProtocolError(format!(
                "unknown entry kind '{other}'"
            ))),
        }
    }
}

/// The resolver's output vocabulary (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Delete,
    Change,
    MoveAway,
    MoveHere,
    CopyAway,
    CopyHere,
    Multicopy,
    Child,
}

/// The unit emitted to persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub path: String,
    pub target_path: Option<String>,
    pub target_rev: Option<i64>,
    pub direct: bool,
    pub change_kind: ChangeKind,
    pub file_kind: FileKind,
}

impl Effect {
    pub fn new(
        path: impl Into<String>,
        change_kind: ChangeKind,
        file_kind: FileKind,
        direct: bool,
    ) -> Self {
        Effect {
            path: path.into(),
            target_path: None,
            target_rev: None,
            direct,
            change_kind,
            file_kind,
        }
    }

    pub fn with_target(mut self, target_path: impl Into<String>, target_rev: i64) -> Self {
        self.target_path = Some(target_path.into());
        self.target_rev = Some(target_rev);
        self
    }
}

/// The resolver's final output: the canonical effect set, keyed by path.
pub type EffectSet = HashMap<String, Effect>;
