//! File-Kind Resolver (C4): classifies `{path, revision}` lookups as
//! file, directory, or deleted via batched `svn ls` against parent
//! URIs. This is the trickiest piece in the spec (§4.4, §9): SVN's
//! batched `list` output carries no echo of which request produced
//! which `<list>` element, so binding must be strictly positional.

use std::collections::{HashMap, VecDeque};

use rayon::prelude::*;

use crate::error::{ParseError, Result};
use crate::invoker::{self, CancellationToken};
use crate::model::{FileKind, LookupKey};
use crate::path;
use crate::xml;

/// Parent-URI batches are capped at this width to stay under typical
/// OS argv limits (§5).
pub const MAX_BATCH: usize = 64;

/// `resolveKinds(repo, lookups) -> kinds`.
///
/// `lookups` maps a requested path to the `{path, revision}` at which
/// its kind should be determined (the requested path and the lookup
/// path differ for deletions resolved via the ancestor scan — see
/// `resolver::plan_delete_lookup`).
pub fn resolve_kinds(
    repo_uri: &str,
    lookups: &HashMap<String, LookupKey>,
    svn_binary: &str,
    batch_size: usize,
    cancel: Option<&CancellationToken>,
) -> Result<HashMap<String, FileKind>> {
    // Group requested paths by the full parent URI (path + revision):
    // every request sharing one parent directory at one revision is
    // answered by a single `<list>` element.
    let mut order: VecDeque<String> = VecDeque::new();
    let mut groups: HashMap<String, Vec<(String, String)>> = HashMap::new();

    for (requested_path, key) in lookups {
        let parent_uri = parent_uri_for(repo_uri, key);
        let child_name = child_name_of(key);
        if !groups.contains_key(&parent_uri) {
            order.push_back(parent_uri.clone());
        }
        groups
            .entry(parent_uri)
            .or_default()
            .push((requested_path.clone(), child_name));
    }

    // `order` is a VecDeque so draining a batch off the front is O(1)
    // per element, giving the teacher's reverse-then-pop trick for
    // free without needing to actually reverse anything. Each batch is
    // its own `svn ls` subprocess, and the batches are independent of
    // one another, so they're dispatched the way the teacher's
    // `filerevs` fans out one `svn info` per prefix: in parallel via
    // rayon, with the results collected back in batch order before any
    // positional binding happens.
    let width = batch_size.min(MAX_BATCH).max(1);
    let mut batches: Vec<Vec<String>> = Vec::new();
    while !order.is_empty() {
        batches.push(order.drain(..order.len().min(width)).collect());
    }

    log::debug!("resolving file kinds across {} batch(es)", batches.len());
    let batch_results: Vec<Result<Vec<(String, FileKind)>>> = batches
        .par_iter()
        .map(|batch| resolve_one_batch(batch, &groups, svn_binary, cancel))
        .collect();

    let mut kinds: HashMap<String, FileKind> = HashMap::new();
    for result in batch_results {
        kinds.extend(result?);
    }

    for requested_path in lookups.keys() {
        kinds.entry(requested_path.clone()).or_insert(FileKind::Deleted);
    }

    Ok(kinds)
}

fn resolve_one_batch(
    batch: &[String],
    groups: &HashMap<String, Vec<(String, String)>>,
    svn_binary: &str,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<(String, FileKind)>> {
    log::debug!("svn ls batch of {} parent uri(s)", batch.len());
    let xml_out = invoker::fetch_list(batch, svn_binary, cancel)?;
    let decoded = xml::decode_flat_list(&xml_out)?;

    if decoded.len() != batch.len() {
        return Err(ParseError::SvnProtocolError(format!(
            "svn ls returned {} <list> elements for a batch of {} uris",
            decoded.len(),
            batch.len()
        )));
    }

    let mut out = Vec::new();
    // Positional binding: the Nth <list> element answers the Nth
    // requested uri, regardless of what its own `path` attribute says
    // (two different revisions of the same parent path are otherwise
    // indistinguishable in the response).
    for (parent_uri, (_, entries)) in batch.iter().zip(decoded.iter()) {
        let group = &groups[parent_uri];
        for (name, kind) in entries {
            for (requested_path, child_name) in group {
                if child_name == name {
                    out.push((requested_path.clone(), *kind));
                }
            }
        }
    }
    Ok(out)
}

fn parent_uri_for(repo_uri: &str, key: &LookupKey) -> String {
    let parent = path::parent(&key.path);
    format!("{repo_uri}{}@{}", path::encode(&parent), key.revision)
}

fn child_name_of(key: &LookupKey) -> String {
    let parent = path::parent(&key.path);
    if parent == "/" {
        key.path.trim_start_matches('/').to_string()
    } else {
        key.path[parent.len() + 1..].to_string()
    }
}
