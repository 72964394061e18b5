//! Recursive Lister (C5): a single `svn ls -R` returning the full
//! recursive `relative-path -> kind` map for a directory at a revision.
//! The only operation whose cost scales with subtree size (§5); callers
//! invoke it only when a directory is deleted or copied/moved.

use std::collections::HashMap;

use crate::error::Result;
use crate::invoker::{self, CancellationToken};
use crate::model::{FileKind, LookupKey};
use crate::path;
use crate::xml;

/// `listRecursive(repo, key) -> map[relPath -> FileKind]`.
pub fn list_recursive(
    repo_uri: &str,
    key: &LookupKey,
    svn_binary: &str,
    cancel: Option<&CancellationToken>,
) -> Result<HashMap<String, FileKind>> {
    let uri = format!("{repo_uri}{}", path::encode(&key.path));
    log::debug!("svn ls -R {uri}@{}", key.revision);
    let xml_out = invoker::fetch_recursive_list(&uri, key.revision, svn_binary, cancel)?;
    let entries = xml::decode_recursive_list(&xml_out)?;
    Ok(entries.into_iter().collect())
}
