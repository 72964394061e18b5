use std::sync::OnceLock;

use chrono::{DateTime, Local};
use colored::*;
use regex::Regex;

use crate::model::{Action, ChangeKind};

/// Parse an SVN-format (RFC 3339) date string. Returns `None` rather
/// than panicking on malformed input — unlike the teacher's
/// `parse_svn_date`, a log entry this crate decodes is not assumed
/// well-formed, since aborting the whole parse over an unparsable date
/// would throw away an otherwise reconstructable commit.
pub fn parse_svn_date(date_str: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|d| d.with_timezone(&Local))
}

/// Colorize an action code the way the teacher's `formatted_log_path`
/// colors `svn log` output; reused by the `svnparse` summary report.
pub fn colored_action(action: Action) -> ColoredString {
    match action {
        Action::Delete => "D".red(),
        Action::Add => "A".green(),
        Action::Modify => "M".blue(),
        Action::Replace => "R".yellow(),
    }
}

fn uri_re() -> &'static Regex {
    static URI: OnceLock<Regex> = OnceLock::new();
    URI.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").unwrap())
}

/// Rejects an obviously-malformed revision or repository URI before a
/// subprocess is spent on it, the way the teacher's `looks_like_revision`
/// guards `svn log`/`svn ls` arguments. A positive result here is not a
/// guarantee the revision exists, only that it is worth asking `svn`
/// about.
pub fn looks_like_revision(rev: i64) -> bool {
    rev >= 0
}

pub fn looks_like_repo_uri(uri: &str) -> bool {
    uri_re().is_match(uri)
}

pub fn change_kind_label(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Add => "ADD",
        ChangeKind::Delete => "DELETE",
        ChangeKind::Change => "CHANGE",
        ChangeKind::MoveAway => "MOVE_AWAY",
        ChangeKind::MoveHere => "MOVE_HERE",
        ChangeKind::CopyAway => "COPY_AWAY",
        ChangeKind::CopyHere => "COPY_HERE",
        ChangeKind::Multicopy => "MULTICOPY",
        ChangeKind::Child => "CHILD",
    }
}
