use std::path::PathBuf;

use crate::cache::TestCaseCache;
use crate::cmd::extract;
use crate::context::AppContext;
use crate::domain::report::{SyncRecord, SyncReport};
use crate::error::AppResult;
use crate::workflow::sync::sync_requirements;

#[derive(Debug, Clone)]
pub struct SyncCommandArgs {
    pub document: PathBuf,
    pub use_cache: bool,
}

pub async fn run(ctx: &AppContext, args: SyncCommandArgs) -> AppResult<SyncReport> {
    let requirements = extract::run(&args.document)?;
    println!(
        "Read {} requirement(s) from {}",
        requirements.len(),
        args.document.display()
    );

    let project = ctx.config.project()?;
    ctx.issue_tracker.verify_project(project).await?;
    ctx.version_control
        .verify_repository(&ctx.config.base_branch)
        .await?;

    let mut cache = if args.use_cache {
        match TestCaseCache::load() {
            Ok(cache) => {
                tracing::debug!(path = %cache.path().display(), "test case cache loaded");
                Some(cache)
            }
            Err(err) => {
                tracing::warn!(error = %err, "test case cache unavailable; continuing without it");
                None
            }
        }
    } else {
        None
    };

    let total = requirements.len();
    let mut done = 0;
    let report = sync_requirements(ctx, &requirements, cache.as_mut(), |record| {
        done += 1;
        print_progress(record, done, total);
    })
    .await?;

    if let Some(cache) = &cache {
        if let Err(err) = cache.save() {
            tracing::warn!(error = %err, "failed to save test case cache");
        }
    }

    Ok(report)
}

fn print_progress(record: &SyncRecord, done: usize, total: usize) {
    let key = record.ticket_key.as_deref().unwrap_or("-");
    println!(
        "[{done}/{total}] {} {key}: ticket {}, branch {} :: {}",
        record.outcome,
        record.ticket.as_str(),
        record.branch.as_str(),
        record.summary
    );
}
