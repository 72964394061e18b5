//! SVN Invoker (C1): builds argument lists, executes `svn log`/`svn
//! ls`/`svn ls -R`, and returns raw XML. Ported from the teacher's
//! `run_svn` chokepoint in `svn.rs`, with a cancellation check added
//! since every svn invocation passes through here.

use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ParseError, Result};

/// A cooperative cancellation flag, checked between subprocess
/// invocations (§5: "Cancellation must be honoured between subprocess
/// invocations").
#[derive(Debug, Default)]
pub struct CancellationToken(AtomicBool);

impl CancellationToken {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn run_svn(svn_binary: &str, args: &[String], cancel: Option<&CancellationToken>) -> Result<String> {
    if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
        return Err(ParseError::Cancelled);
    }

    log::trace!("svn {}", args.join(" "));
    let output = Command::new(svn_binary)
        .arg("--non-interactive")
        .arg("--xml")
        .args(args)
        .output()
        .map_err(|e| ParseError::SvnProtocolError(format!("failed to spawn svn: {e}")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(ParseError::SvnExecFailure {
            argv: args.to_vec(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `fetchLog(uri, rev) -> xml`: `svn log --verbose --xml --limit 1 <uri>@<rev>`.
pub fn fetch_log(uri: &str, rev: i64, svn_binary: &str, cancel: Option<&CancellationToken>) -> Result<String> {
    let args = vec![
        "log".to_string(),
        "--verbose".to_string(),
        "--limit".to_string(),
        "1".to_string(),
        format!("{uri}@{rev}"),
    ];
    run_svn(svn_binary, &args, cancel)
}

/// `fetchList(uris) -> xml`: `svn ls --xml <uri1> <uri2> …`, one process
/// for an arbitrary batch of already-URL-encoded, revision-pinned URIs.
/// Callers (C4) are responsible for bounding batch size to 64.
pub fn fetch_list(uris: &[String], svn_binary: &str, cancel: Option<&CancellationToken>) -> Result<String> {
    let mut args = vec!["list".to_string()];
    args.extend(uris.iter().cloned());
    run_svn(svn_binary, &args, cancel)
}

/// `fetchRecursiveList(uri, rev) -> xml`: `svn ls -R --xml <uri>@<rev>`.
pub fn fetch_recursive_list(
    uri: &str,
    rev: i64,
    svn_binary: &str,
    cancel: Option<&CancellationToken>,
) -> Result<String> {
    let args = vec![
        "list".to_string(),
        "--recursive".to_string(),
        format!("{uri}@{rev}"),
    ];
    run_svn(svn_binary, &args, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_token_short_circuits_before_spawning() {
        let token = CancellationToken::new();
        token.cancel();
        let err = fetch_log("file:///tmp/repo", 1, "svn", Some(&token)).unwrap_err();
        assert!(matches!(err, ParseError::Cancelled));
    }
}
