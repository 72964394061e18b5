//! A Subversion commit change parser: given a single SVN revision of a
//! remote repository, reconstructs the full, recursive, per-path set of
//! effects (add/delete/move/copy/change) with file-vs-directory
//! classification and copy-source provenance.
//!
//! The job queue that schedules one parse per commit, repository
//! metadata lookup, and authentication are external collaborators —
//! see `external::PathAllocator`/`external::CommitIdLookup` for the two
//! seams this crate does own an interface to.

pub mod config;
pub mod error;
pub mod external;
pub mod invoker;
pub mod kinds;
pub mod lister;
pub mod model;
pub mod path;
pub mod resolver;
pub mod store;
pub mod util;
pub mod xml;

use std::collections::{HashMap, HashSet};

use config::Config;
use error::{ParseError, Result};
use external::{CommitIdLookup, PathAllocator};
use invoker::CancellationToken;
use model::EffectSet;
use store::SqliteStore;

/// Parses one SVN revision end to end: fetches and decodes the log,
/// resolves the full effect set (C6), allocates path/commit ids through
/// the caller-supplied external collaborators, and persists both
/// tabular deltas (C7).
///
/// Returns `Ok(None)` for the spec's single benign-empty-parse early
/// exit (§7): a `logentry` with no `<paths>` element. Any other failure
/// is one of the four `ParseError` kinds and leaves prior persisted
/// state for `(repo_id, revision)` untouched, since the writer commits
/// in one transaction.
#[allow(clippy::too_many_arguments)]
pub fn parse(
    repo_uri: &str,
    repo_id: i64,
    revision: i64,
    commit_id: i64,
    cfg: &Config,
    allocator: &mut dyn PathAllocator,
    commit_lookup: &mut dyn CommitIdLookup,
    store: &mut SqliteStore,
    cancel: Option<&CancellationToken>,
) -> Result<Option<EffectSet>> {
    log::debug!("parsing {repo_uri}@{revision}");

    if !util::looks_like_repo_uri(repo_uri) {
        return Err(ParseError::SvnProtocolError(format!(
            "not a well-formed repository uri: {repo_uri}"
        )));
    }
    if !util::looks_like_revision(revision) {
        return Err(ParseError::SvnProtocolError(format!(
            "not a well-formed revision: {revision}"
        )));
    }

    let log_xml = invoker::fetch_log(repo_uri, revision, &cfg.svn_binary, cancel)?;
    let log_entry = xml::decode_log(&log_xml)?;

    if log_entry.paths.is_empty() {
        log::warn!("revision {revision} has no <paths> entries; treating as a benign empty parse");
        return Ok(None);
    }

    let effects = resolver::resolve_effects(repo_uri, &log_entry, cfg, cancel)?;

    // Step 7 — allocate path ids for the union of all paths and target paths.
    let mut all_paths: HashSet<String> = HashSet::new();
    for effect in effects.values() {
        all_paths.insert(effect.path.clone());
        if let Some(target) = &effect.target_path {
            all_paths.insert(target.clone());
        }
    }
    let all_paths: Vec<String> = all_paths.into_iter().collect();
    let path_ids = allocator.lookup_or_create(&all_paths)?;

    let target_revs: Vec<i64> = effects
        .values()
        .filter_map(|e| e.target_rev)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let target_commit_ids: HashMap<i64, i64> = if target_revs.is_empty() {
        HashMap::new()
    } else {
        commit_lookup.lookup_commit_ids(repo_id, &target_revs)?
    };

    store.write_commit(repo_id, revision, commit_id, &effects, &path_ids, &target_commit_ids)?;

    log::debug!("persisted {} effect(s) for {repo_uri}@{revision}", effects.len());
    Ok(Some(effects))
}

/// Revision-cancelled parses should surface `ParseError::Cancelled`
/// rather than partial state; this helper exists purely so callers
/// don't need to match on the enum just to treat cancellation as
/// "not an error worth alarming the operator over."
pub fn is_cancelled(err: &ParseError) -> bool {
    matches!(err, ParseError::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{MapCommitIdLookup, MapPathAllocator};
    use crate::model::{Action, ChangeKind, FileKind, LogEntry, RawPath};

    // End-to-end exercise of resolver + store wiring (S1 from the spec's
    // boundary scenarios), bypassing the subprocess-backed oracles by
    // calling the resolver's building blocks directly is covered in
    // `resolver.rs`; this test instead checks that `parse`'s id/commit
    // plumbing matches what `store::SqliteStore` expects once an effect
    // set already exists.
    #[test]
    fn wires_allocator_and_commit_lookup_outputs_into_the_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut allocator = MapPathAllocator::default();
        let mut commit_lookup = MapCommitIdLookup::default();
        commit_lookup.seed(1, 41, 900);

        let mut effects = EffectSet::new();
        effects.insert(
            "/b.txt".to_string(),
            model::Effect::new("/b.txt", ChangeKind::MoveHere, FileKind::File, true)
                .with_target("/a.txt", 41),
        );
        effects.insert(
            "/".to_string(),
            model::Effect::new("/", ChangeKind::Child, FileKind::Directory, false),
        );

        let mut all_paths: HashSet<String> = HashSet::new();
        for e in effects.values() {
            all_paths.insert(e.path.clone());
            if let Some(t) = &e.target_path {
                all_paths.insert(t.clone());
            }
        }
        let path_ids = allocator
            .lookup_or_create(&all_paths.into_iter().collect::<Vec<_>>())
            .unwrap();
        let target_commit_ids = commit_lookup.lookup_commit_ids(1, &[41]).unwrap();

        store
            .write_commit(1, 42, 1, &effects, &path_ids, &target_commit_ids)
            .unwrap();

        let stored_target_commit: Option<i64> = store
            .conn
            .query_row(
                "SELECT target_commit_id FROM path_change_log WHERE path_id = ?1",
                [path_ids["/b.txt"]],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(stored_target_commit, Some(900));
    }

    #[test]
    fn unknown_action_code_is_rejected() {
        assert!(Action::from_svn_code("Z").is_err());
    }

    #[test]
    fn malformed_repo_uri_is_rejected_before_any_subprocess_runs() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut allocator = MapPathAllocator::default();
        let mut commit_lookup = MapCommitIdLookup::default();
        let err = parse(
            "not-a-uri",
            1,
            42,
            1,
            &config::Config::default(),
            &mut allocator,
            &mut commit_lookup,
            &mut store,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::SvnProtocolError(_)));
    }

    #[test]
    fn log_entry_with_no_raw_paths_constructs_fine() {
        let entry = LogEntry {
            revision: 1,
            author: "a".into(),
            date: None,
            message: String::new(),
            paths: Vec::<RawPath>::new(),
        };
        assert!(entry.paths.is_empty());
    }
}
