//! Effect Resolver (C6) — the algorithmic heart (§4.6). Consumes the
//! decoded log entry plus the kind/listing oracles (C4/C5) and produces
//! the canonical effect set.

use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::error::{ParseError, Result};
use crate::invoker::CancellationToken;
use crate::kinds;
use crate::lister;
use crate::model::{Action, ChangeKind, Effect, EffectSet, FileKind, LogEntry, LookupKey, RawPath};
use crate::path;

/// The C4/C5 oracles, as seen by the resolver: anything shaped like
/// `kinds::resolve_kinds`/`lister::list_recursive`. Took as trait
/// objects (rather than threading `Config` and a live `svn` binary all
/// the way down through `classify_delete`/`classify_add`) so tests can
/// drive the real classification logic against canned responses
/// instead of a subprocess, the same "swap a fake for the real thing"
/// shape the teacher uses for `svn::run_svn` under `SV_SVN`.
type KindOracle<'a> = dyn Fn(&str, &HashMap<String, LookupKey>, Option<&CancellationToken>) -> Result<HashMap<String, FileKind>>
    + 'a;
type ListOracle<'a> =
    dyn Fn(&str, &LookupKey, Option<&CancellationToken>) -> Result<HashMap<String, FileKind>> + 'a;

struct Index {
    raw_by_path: HashMap<String, RawPath>,
    deletes_by_path: HashSet<String>,
    copy_sources: HashMap<String, Vec<String>>,
}

/// Step 1 — index the raw paths.
fn build_index(paths: &[RawPath]) -> Index {
    let mut raw_by_path = HashMap::new();
    let mut deletes_by_path = HashSet::new();
    let mut copy_sources: HashMap<String, Vec<String>> = HashMap::new();

    for raw in paths {
        if raw.action == Action::Delete {
            deletes_by_path.insert(raw.path.clone());
        }
        if let Some(src) = &raw.copy_from_path {
            copy_sources.entry(src.clone()).or_default().push(raw.path.clone());
        }
        raw_by_path.insert(raw.path.clone(), raw.clone());
    }

    Index {
        raw_by_path,
        deletes_by_path,
        copy_sources,
    }
}

/// Step 2 (delete case) — scan ancestors nearest-first; if one is an
/// `A` with `copyFromPath`, the true prior location is
/// `copyFrom + suffix` at `copyFromRev`. Otherwise `(path, rev - 1)`.
fn plan_delete_lookup(deleted_path: &str, index: &Index, current_rev: i64) -> LookupKey {
    for ancestor in path::ancestors(deleted_path, true) {
        if let Some(raw) = index.raw_by_path.get(&ancestor) {
            if raw.action == Action::Add {
                if let Some(copy_from) = &raw.copy_from_path {
                    let suffix = &deleted_path[ancestor.len()..];
                    let resolved_path = format!("{copy_from}{suffix}");
                    let copy_from_rev = raw
                        .copy_from_rev
                        .expect("copy_from_rev set whenever copy_from_path is set");
                    return LookupKey {
                        path: resolved_path,
                        revision: copy_from_rev,
                    };
                }
            }
        }
    }
    LookupKey {
        path: deleted_path.to_string(),
        revision: current_rev - 1,
    }
}

fn src_kind_key(src: &str, rev: i64) -> String {
    format!("{src}@{rev}")
}

/// `resolveEffects(repo, logEntry) -> effects`. Wires the real C4/C5
/// oracles (`kinds::resolve_kinds`, `lister::list_recursive`) against
/// the live `svn` binary named by `cfg`, then delegates to
/// `resolve_effects_with`, which holds the actual algorithm and is
/// exercised directly in this module's tests against canned oracles.
pub fn resolve_effects(
    repo_uri: &str,
    log_entry: &LogEntry,
    cfg: &Config,
    cancel: Option<&CancellationToken>,
) -> Result<EffectSet> {
    let svn_binary = cfg.svn_binary.clone();
    let batch_size = cfg.kind_batch_size;
    let list_binary = svn_binary.clone();

    resolve_effects_with(
        repo_uri,
        log_entry,
        cancel,
        &move |repo_uri, lookups, cancel| {
            kinds::resolve_kinds(repo_uri, lookups, &svn_binary, batch_size, cancel)
        },
        &move |repo_uri, key, cancel| lister::list_recursive(repo_uri, key, &list_binary, cancel),
    )
}

fn resolve_effects_with(
    repo_uri: &str,
    log_entry: &LogEntry,
    cancel: Option<&CancellationToken>,
    resolve_kinds: &KindOracle,
    list_recursive: &ListOracle,
) -> Result<EffectSet> {
    let index = build_index(&log_entry.paths);
    let current_rev = log_entry.revision;

    // Step 2 — plan the primary kind-lookup set (one entry per raw path).
    let mut lookup_for_path: HashMap<String, LookupKey> = HashMap::new();
    for raw in &log_entry.paths {
        let key = match raw.action {
            Action::Delete => plan_delete_lookup(&raw.path, &index, current_rev),
            _ => LookupKey {
                path: raw.path.clone(),
                revision: current_rev,
            },
        };
        lookup_for_path.insert(raw.path.clone(), key);
    }
    let kinds = resolve_kinds(repo_uri, &lookup_for_path, cancel)?;

    // A second, distinctly-keyed batch for copy-source kinds (§4.6 step 3,
    // the "Ask C4 for the source file-kind" sub-step of the `A` case).
    let mut src_lookup: HashMap<String, LookupKey> = HashMap::new();
    for raw in &log_entry.paths {
        if raw.action == Action::Add {
            if let (Some(src), Some(src_rev)) = (&raw.copy_from_path, raw.copy_from_rev) {
                src_lookup.insert(
                    src_kind_key(src, src_rev),
                    LookupKey {
                        path: src.clone(),
                        revision: src_rev,
                    },
                );
            }
        }
    }
    let src_kinds = resolve_kinds(repo_uri, &src_lookup, cancel)?;

    let mut resolved_kinds: HashMap<String, ChangeKind> = HashMap::new();
    let mut supplemental: HashMap<String, (String, i64)> = HashMap::new();
    let mut synthesized: Vec<Effect> = Vec::new();

    // Step 3 — classify each raw path.
    for raw in &log_entry.paths {
        if resolved_kinds.contains_key(&raw.path) {
            continue;
        }

        match raw.action {
            Action::Delete => classify_delete(
                raw,
                &index,
                &kinds,
                &lookup_for_path,
                repo_uri,
                cancel,
                list_recursive,
                &mut resolved_kinds,
                &mut synthesized,
            )?,
            Action::Add => classify_add(
                raw,
                &index,
                &src_kinds,
                repo_uri,
                cancel,
                list_recursive,
                &mut resolved_kinds,
                &mut supplemental,
                &mut synthesized,
            )?,
            Action::Modify | Action::Replace => {
                let kind = if index.copy_sources.contains_key(&raw.path) {
                    ChangeKind::CopyAway
                } else {
                    ChangeKind::Change
                };
                resolved_kinds.insert(raw.path.clone(), kind);
            }
        }
    }

    // Steps 4-5 — merge supplementals and emit direct effects, without
    // overwriting anything already synthesized in step 3.
    let mut effects: EffectSet = HashMap::new();
    for effect in synthesized {
        effects.insert(effect.path.clone(), effect);
    }

    for raw in &log_entry.paths {
        if effects.contains_key(&raw.path) {
            continue;
        }
        let change_kind = resolved_kinds
            .get(&raw.path)
            .copied()
            .expect("every raw path is classified by step 3");
        let file_kind = kinds
            .get(&raw.path)
            .copied()
            .expect("every raw path has a planned kind lookup");

        let mut effect = Effect::new(raw.path.clone(), change_kind, file_kind, true);
        if let Some((target_path, target_rev)) = supplemental.get(&raw.path) {
            effect = effect.with_target(target_path.clone(), *target_rev);
        }
        effects.insert(raw.path.clone(), effect);
    }

    // Step 6 — parent closure.
    let existing_paths: Vec<String> = effects.keys().cloned().collect();
    for p in existing_paths {
        for ancestor in path::ancestors(&p, false) {
            effects.entry(ancestor.clone()).or_insert_with(|| {
                Effect::new(ancestor, ChangeKind::Child, FileKind::Directory, false)
            });
        }
    }

    Ok(effects)
}

#[allow(clippy::too_many_arguments)]
fn classify_delete(
    raw: &RawPath,
    index: &Index,
    kinds: &HashMap<String, FileKind>,
    lookup_for_path: &HashMap<String, LookupKey>,
    repo_uri: &str,
    cancel: Option<&CancellationToken>,
    list_recursive: &ListOracle,
    resolved_kinds: &mut HashMap<String, ChangeKind>,
    synthesized: &mut Vec<Effect>,
) -> Result<()> {
    if let Some(dests) = index.copy_sources.get(&raw.path) {
        let kind = if dests.len() > 1 {
            ChangeKind::Multicopy
        } else {
            ChangeKind::MoveAway
        };
        resolved_kinds.insert(raw.path.clone(), kind);
        return Ok(());
    }

    resolved_kinds.insert(raw.path.clone(), ChangeKind::Delete);

    if kinds.get(&raw.path).copied() == Some(FileKind::Directory) {
        let lookup = &lookup_for_path[&raw.path];
        log::debug!("expanding directory delete at {}", raw.path);
        let descendants = list_recursive(repo_uri, lookup, cancel)?;
        for (rel, kind) in descendants {
            let child_path = path::join(&raw.path, &rel);
            if !index.raw_by_path.contains_key(&child_path) {
                synthesized.push(Effect::new(child_path, ChangeKind::Delete, kind, true));
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn classify_add(
    raw: &RawPath,
    index: &Index,
    src_kinds: &HashMap<String, FileKind>,
    repo_uri: &str,
    cancel: Option<&CancellationToken>,
    list_recursive: &ListOracle,
    resolved_kinds: &mut HashMap<String, ChangeKind>,
    supplemental: &mut HashMap<String, (String, i64)>,
    synthesized: &mut Vec<Effect>,
) -> Result<()> {
    let Some(src) = raw.copy_from_path.clone() else {
        resolved_kinds.insert(raw.path.clone(), ChangeKind::Add);
        return Ok(());
    };
    let src_rev = raw
        .copy_from_rev
        .expect("copy_from_rev set whenever copy_from_path is set");

    let is_move = index.deletes_by_path.contains(&src);
    let (local, partner) = if is_move {
        (ChangeKind::MoveHere, ChangeKind::MoveAway)
    } else {
        (ChangeKind::CopyHere, ChangeKind::CopyAway)
    };
    resolved_kinds.insert(raw.path.clone(), local);
    // The raw path's own target provenance, independent of whether the
    // source turns out to be a file or a directory (§3: targetPath is
    // set iff targetRev is set; S3 requires it on the add itself, not
    // only on synthesized directory-copy descendants).
    supplemental.insert(raw.path.clone(), (src.clone(), src_rev));

    let src_kind = src_kinds
        .get(&src_kind_key(&src, src_rev))
        .copied()
        .ok_or_else(|| {
            ParseError::SvnProtocolError(format!("no kind resolved for copy source {src}@{src_rev}"))
        })?;

    match src_kind {
        FileKind::Deleted => {
            return Err(ParseError::SvnProtocolError(format!(
                "copy source {src}@{src_rev} resolved as deleted"
            )));
        }
        FileKind::File => {
            if !index.raw_by_path.contains_key(&src) {
                synthesized.push(Effect::new(src.clone(), partner, FileKind::File, false));
            }
            // else: src already has its own raw classification — that wins.
        }
        FileKind::Directory => {
            log::debug!("expanding directory copy {} <- {}@{}", raw.path, src, src_rev);
            let descendants =
                list_recursive(repo_uri, &LookupKey { path: src.clone(), revision: src_rev }, cancel)?;

            for (rel, kind) in descendants {
                let to_path = path::join(&raw.path, &rel);
                let from_path = path::join(&src, &rel);
                let target_path = path::join(&src, &rel);

                if !index.raw_by_path.contains_key(&to_path) {
                    synthesized.push(
                        Effect::new(to_path, local, kind, true).with_target(target_path, src_rev),
                    );
                } else {
                    // SVN stripped provenance because the destination was
                    // also independently modified. Stash it for step 4 and
                    // promote a plain `M` to the `*_HERE` kind.
                    supplemental.insert(to_path.clone(), (target_path, src_rev));
                    if index.raw_by_path[&to_path].action == Action::Modify {
                        resolved_kinds.insert(to_path, local);
                    }
                }

                if !index.raw_by_path.contains_key(&from_path) && partner == ChangeKind::CopyAway {
                    synthesized.push(Effect::new(from_path, ChangeKind::CopyAway, kind, false));
                }
            }
        }
    }

    Ok(())
}
