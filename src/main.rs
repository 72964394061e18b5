use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::*;

use svn_change_parser::external::{CommitIdLookup, PathAllocator};
use svn_change_parser::model::Effect;
use svn_change_parser::store::SqliteStore;
use svn_change_parser::util::change_kind_label;
use svn_change_parser::{config, model};

mod commands;

use commands::Opt;

/// Minimal driver around the `svn_change_parser` library, playing the
/// role a job-queue worker plays in production: resolve one commit's
/// effect set and persist it. Not itself the worker — see
/// `SPEC_FULL.md`'s CLI-entry-point section.
fn main() {
    let opt = Opt::parse();
    pretty_env_logger::init();

    match run(opt) {
        Ok(_) => process::exit(0),
        Err(e) => {
            eprintln!("{e:?}");
            process::exit(1);
        }
    }
}

fn run(opt: Opt) -> anyhow::Result<()> {
    let cfg = match &opt.config {
        Some(path) => config::load(path)?,
        None => config::Config::default(),
    };
    let db_path: PathBuf = opt.database.clone().unwrap_or(cfg.database_path.clone());

    // Two connections to the same database: one plays the path/commit
    // id allocator role, the other is the effect-set writer. Kept
    // distinct so the borrow checker doesn't need `parse` to alias a
    // single connection across three simultaneous `&mut` parameters —
    // a real worker would likely own a small connection pool anyway.
    let mut id_store = SqliteStore::open(&db_path)?;
    let mut write_store = SqliteStore::open(&db_path)?;

    let effects = svn_change_parser::parse(
        &opt.repo_uri,
        opt.repo_id,
        opt.revision,
        opt.commit_id,
        &cfg,
        &mut id_store as &mut dyn PathAllocator,
        &mut id_store as &mut dyn CommitIdLookup,
        &mut write_store,
        None,
    )?;

    match effects {
        None => println!("{}", "(benign empty parse: no <paths> at this revision)".yellow()),
        Some(effects) => print_summary(&effects),
    }

    Ok(())
}

fn print_summary(effects: &model::EffectSet) {
    let mut rows: Vec<&Effect> = effects.values().collect();
    rows.sort_by(|a, b| a.path.cmp(&b.path));

    for effect in rows {
        let kind_label = change_kind_label(effect.change_kind).bold();
        let marker = if effect.direct { " " } else { "~" };
        let provenance = match (&effect.target_path, effect.target_rev) {
            (Some(p), Some(r)) => format!(" (from {} {})", p.magenta(), r.to_string().yellow()),
            _ => String::new(),
        };
        println!(
            "{marker} {:<10} {}{provenance}",
            kind_label,
            effect.path,
        );
    }
}
