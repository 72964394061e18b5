//! External collaborator traits (§4.6 step 7, §6): the path-id
//! allocator and the SVN-commit-id lookup are black boxes the spec
//! scopes out of the core. Modeled as traits so the resolver/writer can
//! be driven against fakes in tests, with `store::SqliteStore`
//! providing the production implementation for both.

use std::collections::HashMap;

use crate::error::Result;

/// `lookupOrCreatePaths([string]) -> map[string -> int]`, an idempotent
/// bulk upsert.
pub trait PathAllocator {
    fn lookup_or_create(&mut self, paths: &[String]) -> Result<HashMap<String, i64>>;
}

/// `lookupCommitIds(repo, [rev]) -> map[rev -> int]`, returning only
/// those revisions already recorded — missing entries are silently
/// dropped downstream (§4.6 step 7).
pub trait CommitIdLookup {
    fn lookup_commit_ids(&mut self, repo_id: i64, revisions: &[i64]) -> Result<HashMap<i64, i64>>;
}

/// Trivial in-memory fakes for unit tests, mirroring the teacher's
/// habit of swapping a stub for `svn::run_svn` under `SV_SVN` rather
/// than hitting a real server.
#[derive(Debug, Default)]
pub struct MapPathAllocator {
    next_id: i64,
    ids: HashMap<String, i64>,
}

impl PathAllocator for MapPathAllocator {
    fn lookup_or_create(&mut self, paths: &[String]) -> Result<HashMap<String, i64>> {
        let mut out = HashMap::new();
        for path in paths {
            let id = match self.ids.get(path) {
                Some(id) => *id,
                None => {
                    self.next_id += 1;
                    self.ids.insert(path.clone(), self.next_id);
                    self.next_id
                }
            };
            out.insert(path.clone(), id);
        }
        Ok(out)
    }
}

#[derive(Debug, Default)]
pub struct MapCommitIdLookup {
    ids: HashMap<(i64, i64), i64>,
}

impl MapCommitIdLookup {
    pub fn seed(&mut self, repo_id: i64, revision: i64, commit_id: i64) {
        self.ids.insert((repo_id, revision), commit_id);
    }
}

impl CommitIdLookup for MapCommitIdLookup {
    fn lookup_commit_ids(&mut self, repo_id: i64, revisions: &[i64]) -> Result<HashMap<i64, i64>> {
        let mut out = HashMap::new();
        for rev in revisions {
            if let Some(id) = self.ids.get(&(repo_id, *rev)) {
                out.insert(*rev, *id);
            }
        }
        Ok(out)
    }
}
