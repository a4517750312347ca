use std::collections::HashMap;

use tracing::Instrument;

use crate::cache::TestCaseCache;
use crate::context::AppContext;
use crate::domain::branch::BranchName;
use crate::domain::report::{Outcome, StepStatus, SyncRecord, SyncReport};
use crate::domain::requirement::Requirement;
use crate::domain::state::{RequirementProgress, RequirementState};
use crate::domain::ticket::{TestCases, TicketDraft, TrackerResolution};
use crate::error::AppResult;
use crate::services::TestCaseGenerator;
use crate::services::test_case_generator::usable_output;

/// Runs every requirement through generate → tracker → workspace, one at a time.
///
/// Per-requirement failures end up in the report; only configuration problems abort the run.
pub async fn sync_requirements<F>(
    ctx: &AppContext,
    requirements: &[Requirement],
    mut cache: Option<&mut TestCaseCache>,
    mut on_record: F,
) -> AppResult<SyncReport>
where
    F: FnMut(&SyncRecord),
{
    let project = ctx.config.project()?.to_string();
    let mut run = RunLedger::default();
    let mut report = SyncReport::default();

    for requirement in requirements {
        let record = sync_requirement(ctx, &project, requirement, cache.as_deref_mut(), &mut run)
            .instrument(tracing::info_span!("requirement", index = requirement.index))
            .await;
        on_record(&record);
        report.records.push(record);
    }

    Ok(report)
}

/// Summaries resolved earlier in this run, so a repeated requirement does not depend on
/// the tracker's search index having caught up with a creation made seconds ago.
#[derive(Default)]
struct RunLedger {
    keys_by_summary: HashMap<String, String>,
}

async fn sync_requirement(
    ctx: &AppContext,
    project: &str,
    requirement: &Requirement,
    cache: Option<&mut TestCaseCache>,
    run: &mut RunLedger,
) -> SyncRecord {
    let mut progress = RequirementProgress::new();

    advance(&mut progress, RequirementState::GeneratingTests);
    let test_cases =
        generate_test_cases(ctx.test_case_generator.as_ref(), &requirement.text, cache).await;
    let draft = TicketDraft::from_requirement(&requirement.text, test_cases);
    let mut record = pending_record(requirement, &draft);

    let resolution = match run.keys_by_summary.get(&draft.summary) {
        Some(key) => {
            tracing::info!(key = %key, "summary already resolved earlier in this run");
            Ok(TrackerResolution {
                key: key.clone(),
                created: false,
                url: None,
            })
        }
        None => {
            ctx.issue_tracker
                .resolve(project, &draft, ctx.config.summary_match)
                .await
        }
    };

    let resolution = match resolution {
        Ok(resolution) => resolution,
        Err(err) => {
            tracing::error!(error = %err, "tracker step failed");
            advance(&mut progress, RequirementState::Failed);
            record.ticket = StepStatus::Failed;
            record.error = Some(err.to_string());
            record.reached = progress.last_reached();
            return record;
        }
    };

    if resolution.created {
        tracing::info!(key = %resolution.key, url = ?resolution.url, "ticket created");
    } else {
        tracing::info!(key = %resolution.key, "ticket already exists");
    }
    run.keys_by_summary
        .insert(draft.summary.clone(), resolution.key.clone());
    record.ticket_key = Some(resolution.key.clone());
    record.ticket = StepStatus::from_created(resolution.created);
    advance(&mut progress, RequirementState::TrackerResolved);

    let branch = match BranchName::from_ticket_key(&resolution.key) {
        Ok(branch) => {
            ctx.version_control
                .ensure_branch(&branch, &ctx.config.base_branch, &draft.summary)
                .await
        }
        Err(err) => Err(err),
    };

    match branch {
        Ok(branch) => {
            advance(&mut progress, RequirementState::WorkspaceResolved);
            record.branch = StepStatus::from_created(branch.created);
            record.branch_created = branch.created;
            record.scaffold = branch.scaffold;
            record.outcome = if resolution.created {
                Outcome::Created
            } else {
                Outcome::AlreadyExisted
            };
            advance(&mut progress, RequirementState::Done);
        }
        Err(err) => {
            tracing::error!(key = %resolution.key, error = %err, "workspace step failed");
            advance(&mut progress, RequirementState::Failed);
            record.branch = StepStatus::Failed;
            record.error = Some(err.to_string());
        }
    }

    tracing::debug!(states = ?progress.history(), "requirement finished");
    record.reached = progress.last_reached();
    record
}

async fn generate_test_cases(
    generator: &dyn TestCaseGenerator,
    requirement: &str,
    cache: Option<&mut TestCaseCache>,
) -> TestCases {
    let key = TestCaseCache::compute_key(generator.model(), requirement);
    if let Some(cached) = cache.as_ref().and_then(|cache| cache.get(&key)) {
        tracing::debug!("using cached test cases");
        return TestCases::Generated(cached);
    }

    let output = match generator.generate(requirement).await {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!(error = %err, "test case generation failed; using placeholder");
            return TestCases::Placeholder {
                reason: err.to_string(),
            };
        }
    };

    match usable_output(requirement, &output) {
        Ok(cleaned) => {
            if let Some(cache) = cache {
                cache.insert(key, &cleaned);
            }
            TestCases::Generated(cleaned)
        }
        Err(reason) => {
            tracing::warn!(%reason, "generated test cases unusable; using placeholder");
            TestCases::Placeholder { reason }
        }
    }
}

fn pending_record(requirement: &Requirement, draft: &TicketDraft) -> SyncRecord {
    SyncRecord {
        requirement: requirement.text.clone(),
        summary: draft.summary.clone(),
        ticket_key: None,
        ticket: StepStatus::Skipped,
        branch: StepStatus::Skipped,
        branch_created: false,
        scaffold: None,
        test_cases_degraded: draft.test_cases.is_degraded(),
        outcome: Outcome::Failed,
        reached: RequirementState::Pending,
        error: None,
    }
}

fn advance(progress: &mut RequirementProgress, to: RequirementState) {
    if let Err(err) = progress.advance(to) {
        tracing::error!(error = %err, "requirement state machine rejected transition");
    }
}
