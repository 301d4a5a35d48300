//! Execution engine - applies planned changes in parallel

use crate::context::{ConfirmCallback, Context, ProgressCallback};
use crate::error::{Error, Result};
use crate::planner::PlannedChange;
use crate::resource::BoxedResource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use rayon::prelude::*;
use serde_json::Value as Json;

/// A planned change ready to apply
pub struct PendingChange {
    /// Address such as `stacklet_account.prod`
    pub address: String,
    pub resource: BoxedResource,
    pub change: PlannedChange,
    pub config: Option<Json>,
    pub prior: Option<Json>,
}

/// Outcome for one address
#[derive(Debug, Clone)]
pub struct Applied {
    pub address: String,
    pub result: ApplyResult,
    /// State to persist; the prior record when the apply failed or was skipped
    pub state: Option<Json>,
}

/// Apply every pending change
///
/// No-op changes are passed through without touching the remote. The caller
/// is asked once before anything is applied; declining skips everything.
pub fn execute<P, C>(
    ctx: &Context,
    pending: Vec<PendingChange>,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<(ExecuteSummary, Vec<Applied>)>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let (work, unchanged): (Vec<_>, Vec<_>) = pending.into_iter().partition(|p| p.change.has_changes());

    let mut summary = ExecuteSummary::default();
    let mut applied: Vec<Applied> = unchanged
        .into_iter()
        .map(|p| {
            summary.add_result(&ApplyResult::NoChange);
            Applied {
                address: p.address,
                result: ApplyResult::NoChange,
                state: p.prior,
            }
        })
        .collect();

    if work.is_empty() {
        return Ok((summary, applied));
    }

    let skip = |reason: &str, work: Vec<PendingChange>, summary: &mut ExecuteSummary| -> Vec<Applied> {
        work.into_iter()
            .map(|p| {
                let result = ApplyResult::Skipped {
                    reason: reason.to_string(),
                };
                summary.add_result(&result);
                Applied {
                    address: p.address,
                    result,
                    state: p.prior,
                }
            })
            .collect()
    };

    if opts.dry_run {
        applied.extend(skip("Dry run", work, &mut summary));
        return Ok((summary, applied));
    }

    if !confirm.confirm("Apply changes?")? {
        applied.extend(skip("Declined", work, &mut summary));
        return Ok((summary, applied));
    }

    progress.on_batch_start(work.len());
    let results = execute_batch(ctx, &work, opts.jobs)?;
    for outcome in results {
        progress.on_resource_complete(&outcome.address, &outcome.result);
        summary.add_result(&outcome.result);
        applied.push(outcome);
    }
    progress.on_batch_complete();

    Ok((summary, applied))
}

/// Apply a batch, sequentially when `jobs` is 1
fn execute_batch(ctx: &Context, work: &[PendingChange], jobs: usize) -> Result<Vec<Applied>> {
    if jobs <= 1 || work.len() == 1 {
        return Ok(work.iter().map(|p| apply_one(ctx, p)).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| Error::InvalidState(format!("failed to create thread pool: {e}")))?;

    Ok(pool.install(|| work.par_iter().map(|p| apply_one(ctx, p)).collect()))
}

fn apply_one(ctx: &Context, pending: &PendingChange) -> Applied {
    if ctx.cancel.is_cancelled() {
        return Applied {
            address: pending.address.clone(),
            result: ApplyResult::Skipped {
                reason: "Cancelled".to_string(),
            },
            state: pending.prior.clone(),
        };
    }
    log::debug!("{}: {}", pending.address, pending.change.action);
    match pending.resource.apply(
        ctx,
        &pending.change,
        pending.config.as_ref(),
        pending.prior.as_ref(),
    ) {
        Ok(state) => Applied {
            address: pending.address.clone(),
            result: ApplyResult::for_action(pending.change.action),
            state,
        },
        Err(e) => {
            log::error!("{}: {e}", pending.address);
            Applied {
                address: pending.address.clone(),
                result: ApplyResult::Failed { error: e.to_string() },
                state: pending.prior.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::import::ImportKeys;
    use crate::resource::DynResource;
    use crate::schema::Schema;
    use crate::types::Action;
    use serde_json::json;
    use std::sync::Arc;

    struct Echo {
        fail: bool,
    }

    impl DynResource for Echo {
        fn kind(&self) -> &'static str {
            "stacklet_echo"
        }

        fn attributes(&self) -> Schema {
            Schema::new("stacklet_echo")
        }

        fn import_format(&self) -> String {
            ImportKeys::new(&["id"]).format_hint()
        }

        fn plan(&self, _config: Option<&Json>, _prior: Option<&Json>) -> Result<PlannedChange> {
            unreachable!()
        }

        fn apply(
            &self,
            _ctx: &Context,
            change: &PlannedChange,
            _config: Option<&Json>,
            _prior: Option<&Json>,
        ) -> Result<Option<Json>> {
            if self.fail {
                return Err(Error::Transport("boom".into()));
            }
            Ok(change.planned.clone())
        }

        fn refresh(&self, _ctx: &Context, state: &Json) -> Result<Option<Json>> {
            Ok(Some(state.clone()))
        }

        fn import_state(&self, _ctx: &Context, _id: &str) -> Result<Json> {
            Ok(json!({}))
        }
    }

    fn pending(address: &str, action: Action, fail: bool) -> PendingChange {
        PendingChange {
            address: address.to_string(),
            resource: Arc::new(Echo { fail }),
            change: PlannedChange {
                action,
                planned: Some(json!({"id": address})),
                changes: Vec::new(),
                replace_paths: Vec::new(),
            },
            config: Some(json!({})),
            prior: Some(json!({"id": "old"})),
        }
    }

    #[test]
    fn test_execute_empty() {
        let (summary, applied) = execute(
            &Context::new(),
            Vec::new(),
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(summary.total(), 0);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_execute_parallel_with_failure() {
        let work = vec![
            pending("a", Action::Create, false),
            pending("b", Action::Update, false),
            pending("c", Action::Update, true),
            pending("d", Action::NoOp, false),
        ];
        let (summary, applied) = execute(
            &Context::new(),
            work,
            &ExecuteOptions { dry_run: false, jobs: 4 },
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.no_change, 1);
        let failed = applied.iter().find(|a| a.address == "c").unwrap();
        assert_eq!(failed.state, Some(json!({"id": "old"})));
    }

    #[test]
    fn test_dry_run_and_decline_skip() {
        let opts = ExecuteOptions { dry_run: true, jobs: 1 };
        let (summary, _) = execute(
            &Context::new(),
            vec![pending("a", Action::Create, false)],
            &opts,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(summary.skipped, 1);

        let (summary, applied) = execute(
            &Context::new(),
            vec![pending("a", Action::Delete, false)],
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(applied[0].state, Some(json!({"id": "old"})));
    }

    #[test]
    fn test_cancelled_work_keeps_prior() {
        let ctx = Context::new();
        ctx.cancel.cancel();
        let (summary, applied) = execute(
            &ctx,
            vec![pending("a", Action::Update, false), pending("b", Action::Create, false)],
            &ExecuteOptions { dry_run: false, jobs: 2 },
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(summary.skipped, 2);
        assert!(applied.iter().all(|a| a.state == Some(json!({"id": "old"}))));
    }
}
