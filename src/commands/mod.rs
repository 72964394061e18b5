use std::path::PathBuf;

use clap::Parser;

/// Parse one SVN revision and persist its effect set.
#[derive(Debug, Parser)]
#[command(name = "svnparse", version, about)]
pub struct Opt {
    /// Repository root URI, e.g. https://svn.example.com/repo
    pub repo_uri: String,

    /// Revision to parse.
    pub revision: i64,

    /// Repository id in the persistent store (defaults to 1 for the
    /// single-repo harness).
    #[arg(long, default_value_t = 1)]
    pub repo_id: i64,

    /// Commit id this revision maps to in the persistent store
    /// (allocated externally in production; the harness just takes it
    /// as a flag since there is no real job queue behind it here).
    #[arg(long)]
    pub commit_id: i64,

    /// Sqlite database path. Overrides the config file's database_path.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Path to a JSON config file (svn binary override, batch size, db path).
    #[arg(long)]
    pub config: Option<PathBuf>,
}
