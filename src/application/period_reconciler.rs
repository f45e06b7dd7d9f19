use crate::application::retry::RetryPolicy;
use crate::domain::models::{CalendarDate, DateRange, PeriodDaySet};
use crate::infrastructure::cycle_api_client::CycleApiClient;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::period_day_mapper;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodDiff {
    pub to_add: PeriodDaySet,
    pub to_remove: PeriodDaySet,
}

impl PeriodDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    Idle,
    Saving,
    Error,
}

/// Diff captured when a save starts. Toggles made while it is in flight land
/// in the next diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePlan {
    diff: PeriodDiff,
}

impl SavePlan {
    pub fn diff(&self) -> &PeriodDiff {
        &self.diff
    }

    /// Sends the add batch, then the remove batch. Stops at the first batch
    /// that is not fully confirmed.
    pub async fn execute<C>(self, client: &C) -> SaveOutcome
    where
        C: CycleApiClient + ?Sized,
    {
        let mut outcome = SaveOutcome::default();

        if !self.diff.to_add.is_empty() {
            let (confirmed, error) = send_batch(client, &self.diff.to_add, true).await;
            outcome.added = confirmed;
            if error.is_some() {
                outcome.error = error;
                return outcome;
            }
        }

        if !self.diff.to_remove.is_empty() {
            let (confirmed, error) = send_batch(client, &self.diff.to_remove, false).await;
            outcome.removed = confirmed;
            outcome.error = error;
        }

        outcome
    }
}

/// What the remote confirmed during one save, plus the failure that ended it.
#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub added: PeriodDaySet,
    pub removed: PeriodDaySet,
    pub error: Option<InfraError>,
}

async fn send_batch<C>(
    client: &C,
    dates: &PeriodDaySet,
    is_period_day: bool,
) -> (PeriodDaySet, Option<InfraError>)
where
    C: CycleApiClient + ?Sized,
{
    debug!(count = dates.len(), is_period_day, "sending period day batch");
    let records = match client.batch_period_days(dates, is_period_day).await {
        Ok(records) => records,
        Err(error) => return (PeriodDaySet::new(), Some(error)),
    };

    let confirmed: PeriodDaySet = records
        .iter()
        .filter(|record| record.is_period_day == is_period_day && dates.contains(record.date))
        .map(|record| record.date)
        .collect();

    if confirmed.len() == dates.len() {
        (confirmed, None)
    } else {
        let error = InfraError::remote(
            format!("confirmed {} of {} dates", confirmed.len(), dates.len()),
            None,
        );
        (confirmed, Some(error))
    }
}

/// Baseline/working pair for period days.
///
/// `baseline` only ever holds dates the remote confirmed; `working` is the
/// user's edit. All mutation goes through `&mut self`, so one owner drives
/// the reconciler at a time.
#[derive(Debug, Clone)]
pub struct SelectionReconciler {
    baseline: PeriodDaySet,
    working: PeriodDaySet,
    status: FlightStatus,
    retry_policy: RetryPolicy,
}

impl Default for SelectionReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionReconciler {
    pub fn new() -> Self {
        Self {
            baseline: PeriodDaySet::new(),
            working: PeriodDaySet::new(),
            status: FlightStatus::Idle,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn baseline(&self) -> &PeriodDaySet {
        &self.baseline
    }

    pub fn working(&self) -> &PeriodDaySet {
        &self.working
    }

    pub fn status(&self) -> FlightStatus {
        self.status
    }

    /// Replaces both sets inside `range` with the remote view. Dates outside
    /// the range are kept. On failure nothing changes.
    pub async fn load<C>(
        &mut self,
        range: DateRange,
        client: &C,
    ) -> Result<PeriodDaySet, InfraError>
    where
        C: CycleApiClient + ?Sized,
    {
        let records = self
            .retry_policy
            .run("list period days", move || client.list_period_days(range))
            .await?;
        let fetched = period_day_mapper::period_days_from_records(&records).within(&range);

        self.baseline = self.baseline.replace_range(&range, &fetched);
        self.working = self.working.replace_range(&range, &fetched);
        info!(%range, count = fetched.len(), "period days loaded");
        Ok(fetched)
    }

    /// Flips `date` in the working set. Returns whether it is now selected.
    pub fn toggle(&mut self, date: CalendarDate, today: CalendarDate) -> Result<bool, InfraError> {
        if date > today {
            return Err(InfraError::InvariantViolation(format!(
                "cannot mark future date {date} (today is {today})"
            )));
        }
        Ok(self.working.toggle(date))
    }

    pub fn compute_diff(&self) -> PeriodDiff {
        PeriodDiff {
            to_add: self.working.difference(&self.baseline),
            to_remove: self.baseline.difference(&self.working),
        }
    }

    /// Snapshots the diff and marks the reconciler as saving. `None` means
    /// there is nothing to send.
    pub fn begin_save(&mut self) -> Result<Option<SavePlan>, InfraError> {
        if self.status == FlightStatus::Saving {
            return Err(InfraError::InvariantViolation(
                "a save is already in flight".to_string(),
            ));
        }

        let diff = self.compute_diff();
        if diff.is_empty() {
            self.status = FlightStatus::Idle;
            return Ok(None);
        }

        self.status = FlightStatus::Saving;
        Ok(Some(SavePlan { diff }))
    }

    /// Commits whatever the remote confirmed, even when the save failed
    /// part-way. `working` is left alone.
    pub fn finish_save(&mut self, outcome: SaveOutcome) -> Result<PeriodDaySet, InfraError> {
        self.baseline = self
            .baseline
            .union(&outcome.added)
            .difference(&outcome.removed);

        match outcome.error {
            None => {
                self.status = FlightStatus::Idle;
                info!(
                    added = outcome.added.len(),
                    removed = outcome.removed.len(),
                    "period days saved"
                );
                Ok(self.baseline.clone())
            }
            Some(error) => {
                self.status = FlightStatus::Error;
                Err(error)
            }
        }
    }

    /// Releases a save whose plan was dropped before `finish_save`. The
    /// baseline is untouched, so the next diff resends the whole plan.
    pub fn cancel_save(&mut self) {
        if self.status == FlightStatus::Saving {
            self.status = FlightStatus::Idle;
            debug!("period day save abandoned before completion");
        }
    }

    pub async fn save<C>(&mut self, client: &C) -> Result<PeriodDaySet, InfraError>
    where
        C: CycleApiClient + ?Sized,
    {
        let Some(plan) = self.begin_save()? else {
            debug!("period day diff is empty; nothing to save");
            return Ok(self.baseline.clone());
        };
        let in_flight = InFlightSave {
            reconciler: self,
            finished: false,
        };
        let outcome = plan.execute(client).await;
        in_flight.finish(outcome)
    }
}

/// Held across the batch calls of `save`. Dropping the save future early
/// cancels the save instead of leaving the status stuck at `Saving`.
struct InFlightSave<'a> {
    reconciler: &'a mut SelectionReconciler,
    finished: bool,
}

impl InFlightSave<'_> {
    fn finish(mut self, outcome: SaveOutcome) -> Result<PeriodDaySet, InfraError> {
        self.finished = true;
        self.reconciler.finish_save(outcome)
    }
}

impl Drop for InFlightSave<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.reconciler.cancel_save();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fake_client::{
        date, FakeBatch, FakeCall, FakeCycleApiClient, FakeFailure,
    };
    use crate::domain::models::YearMonth;
    use proptest::prelude::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn set(values: &[&str]) -> PeriodDaySet {
        values.iter().map(|value| date(value)).collect()
    }

    fn january() -> DateRange {
        YearMonth::new(2024, 1).expect("valid month").range()
    }

    fn today() -> CalendarDate {
        date("2024-01-31")
    }

    fn fast_reconciler() -> SelectionReconciler {
        SelectionReconciler::new().with_retry_policy(RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
        })
    }

    #[tokio::test]
    async fn toggled_add_and_remove_are_saved_in_two_ordered_batches() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05"), date("2024-01-06")]);
        let mut reconciler = fast_reconciler();
        reconciler.load(january(), &client).await.expect("load");

        reconciler.toggle(date("2024-01-06"), today()).expect("toggle off");
        reconciler.toggle(date("2024-01-10"), today()).expect("toggle on");

        let diff = reconciler.compute_diff();
        assert_eq!(diff.to_add, set(&["2024-01-10"]));
        assert_eq!(diff.to_remove, set(&["2024-01-06"]));

        let saved = reconciler.save(&client).await.expect("save");
        assert_eq!(saved, set(&["2024-01-05", "2024-01-10"]));
        assert_eq!(reconciler.baseline(), &set(&["2024-01-05", "2024-01-10"]));
        assert_eq!(reconciler.status(), FlightStatus::Idle);
        assert_eq!(
            client.batch_log(),
            vec![
                (vec![date("2024-01-10")], true),
                (vec![date("2024-01-06")], false),
            ]
        );
    }

    #[tokio::test]
    async fn load_then_save_issues_no_remote_writes() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05")]);
        let mut reconciler = fast_reconciler();
        reconciler.load(january(), &client).await.expect("load");

        assert!(reconciler.compute_diff().is_empty());
        reconciler.save(&client).await.expect("empty save");

        assert_eq!(client.batch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.calls(), vec![FakeCall::ListPeriodDays(january())]);
    }

    #[tokio::test]
    async fn second_save_after_success_is_a_no_op() {
        let client = FakeCycleApiClient::default();
        let mut reconciler = fast_reconciler();
        reconciler.toggle(date("2024-01-03"), today()).expect("toggle");

        reconciler.save(&client).await.expect("first save");
        reconciler.save(&client).await.expect("second save");

        assert_eq!(client.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_batch_retry_resends_only_unconfirmed_dates() {
        let client = FakeCycleApiClient::default();
        client.script_batches(vec![FakeBatch::ConfirmOnly(vec![date("2024-01-01")])]);
        let mut reconciler = fast_reconciler();
        reconciler.toggle(date("2024-01-01"), today()).expect("toggle");
        reconciler.toggle(date("2024-01-02"), today()).expect("toggle");

        let error = reconciler.save(&client).await.expect_err("partial batch");
        assert_eq!(error.to_string(), "confirmed 1 of 2 dates");
        assert_eq!(reconciler.baseline(), &set(&["2024-01-01"]));
        assert_eq!(reconciler.status(), FlightStatus::Error);

        reconciler.save(&client).await.expect("retry");
        assert_eq!(
            client.batch_log(),
            vec![
                (vec![date("2024-01-01"), date("2024-01-02")], true),
                (vec![date("2024-01-02")], true),
            ]
        );
        assert_eq!(reconciler.baseline(), &set(&["2024-01-01", "2024-01-02"]));
    }

    #[tokio::test]
    async fn failed_add_batch_skips_remove_batch_and_keeps_baseline() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05")]);
        let mut reconciler = fast_reconciler();
        reconciler.load(january(), &client).await.expect("load");
        reconciler.toggle(date("2024-01-05"), today()).expect("toggle off");
        reconciler.toggle(date("2024-01-08"), today()).expect("toggle on");
        client.script_batches(vec![FakeBatch::Fail(FakeFailure::Network)]);

        let error = reconciler.save(&client).await.expect_err("add fails");
        assert!(matches!(error, InfraError::Network(_)));
        assert_eq!(client.batch_log().len(), 1);
        assert_eq!(reconciler.baseline(), &set(&["2024-01-05"]));
        assert_eq!(reconciler.working(), &set(&["2024-01-08"]));

        let retry_diff = reconciler.compute_diff();
        assert_eq!(retry_diff.to_add, set(&["2024-01-08"]));
        assert_eq!(retry_diff.to_remove, set(&["2024-01-05"]));
    }

    #[tokio::test]
    async fn partially_confirmed_add_batch_skips_remove_batch() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05")]);
        let mut reconciler = fast_reconciler();
        reconciler.load(january(), &client).await.expect("load");
        reconciler.toggle(date("2024-01-05"), today()).expect("toggle off");
        reconciler.toggle(date("2024-01-08"), today()).expect("toggle on");
        reconciler.toggle(date("2024-01-09"), today()).expect("toggle on");
        client.script_batches(vec![FakeBatch::ConfirmOnly(vec![date("2024-01-08")])]);

        let error = reconciler.save(&client).await.expect_err("partial add batch");
        assert_eq!(error.to_string(), "confirmed 1 of 2 dates");
        assert_eq!(
            client.batch_log(),
            vec![(vec![date("2024-01-08"), date("2024-01-09")], true)]
        );
        assert_eq!(reconciler.baseline(), &set(&["2024-01-05", "2024-01-08"]));
        assert_eq!(reconciler.status(), FlightStatus::Error);

        let retry_diff = reconciler.compute_diff();
        assert_eq!(retry_diff.to_add, set(&["2024-01-09"]));
        assert_eq!(retry_diff.to_remove, set(&["2024-01-05"]));
    }

    #[tokio::test]
    async fn failed_remove_batch_commits_confirmed_adds() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05")]);
        let mut reconciler = fast_reconciler();
        reconciler.load(january(), &client).await.expect("load");
        reconciler.toggle(date("2024-01-05"), today()).expect("toggle off");
        reconciler.toggle(date("2024-01-08"), today()).expect("toggle on");
        client.script_batches(vec![
            FakeBatch::ConfirmAll,
            FakeBatch::Fail(FakeFailure::Rejected("period day locked", 409)),
        ]);

        let error = reconciler.save(&client).await.expect_err("remove fails");
        assert_eq!(error.code(), Some(409));
        assert_eq!(reconciler.baseline(), &set(&["2024-01-05", "2024-01-08"]));

        reconciler.save(&client).await.expect("retry removal");
        assert_eq!(
            client.batch_log(),
            vec![
                (vec![date("2024-01-08")], true),
                (vec![date("2024-01-05")], false),
                (vec![date("2024-01-05")], false),
            ]
        );
        assert_eq!(reconciler.baseline(), &set(&["2024-01-08"]));
        assert_eq!(client.remote_days(), set(&["2024-01-08"]));
    }

    #[tokio::test]
    async fn failed_load_leaves_state_untouched() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05")]);
        let mut reconciler = SelectionReconciler::new().with_retry_policy(RetryPolicy::no_retry());
        reconciler.load(january(), &client).await.expect("load");
        reconciler.toggle(date("2024-01-07"), today()).expect("toggle");

        client.fail_next_lists(vec![FakeFailure::Rejected("unauthorized", 401)]);
        let error = reconciler.load(january(), &client).await.expect_err("load fails");

        assert_eq!(error.code(), Some(401));
        assert_eq!(reconciler.baseline(), &set(&["2024-01-05"]));
        assert_eq!(reconciler.working(), &set(&["2024-01-05", "2024-01-07"]));
    }

    #[tokio::test]
    async fn load_retries_network_failures() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05")]);
        client.fail_next_lists(vec![FakeFailure::Network]);
        let mut reconciler = fast_reconciler();

        let fetched = reconciler.load(january(), &client).await.expect("load after retry");

        assert_eq!(fetched, set(&["2024-01-05"]));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_replaces_only_the_requested_range() {
        let client = FakeCycleApiClient::with_remote([date("2024-01-05"), date("2024-02-02")]);
        let mut reconciler = fast_reconciler();
        let february = YearMonth::new(2024, 2).expect("valid month").range();
        reconciler.load(february, &client).await.expect("load february");
        reconciler.toggle(date("2024-01-20"), date("2024-02-29")).expect("toggle");

        reconciler.load(january(), &client).await.expect("load january");

        assert_eq!(reconciler.baseline(), &set(&["2024-01-05", "2024-02-02"]));
        assert_eq!(reconciler.working(), &set(&["2024-01-05", "2024-02-02"]));
    }

    #[test]
    fn future_toggle_is_rejected_without_mutation() {
        let mut reconciler = SelectionReconciler::new();
        let result = reconciler.toggle(date("2024-02-01"), today());

        assert!(matches!(result, Err(InfraError::InvariantViolation(_))));
        assert!(reconciler.working().is_empty());
        assert!(reconciler.toggle(today(), today()).expect("today is allowed"));
    }

    #[tokio::test]
    async fn save_in_flight_rejects_a_second_save_and_keeps_later_toggles() {
        let client = FakeCycleApiClient::default();
        let mut reconciler = fast_reconciler();
        reconciler.toggle(date("2024-01-03"), today()).expect("toggle");

        let plan = reconciler.begin_save().expect("begin").expect("non-empty plan");
        assert_eq!(reconciler.status(), FlightStatus::Saving);
        assert!(matches!(reconciler.begin_save(), Err(InfraError::InvariantViolation(_))));

        reconciler.toggle(date("2024-01-04"), today()).expect("toggle during save");
        let outcome = plan.execute(&client).await;
        reconciler.finish_save(outcome).expect("finish");

        assert_eq!(reconciler.baseline(), &set(&["2024-01-03"]));
        assert_eq!(reconciler.compute_diff().to_add, set(&["2024-01-04"]));
        assert_eq!(client.batch_log(), vec![(vec![date("2024-01-03")], true)]);
    }

    #[tokio::test]
    async fn dropped_save_releases_the_in_flight_status() {
        let client = FakeCycleApiClient::default();
        client.script_batches(vec![FakeBatch::Hang]);
        let mut reconciler = fast_reconciler();
        reconciler.toggle(date("2024-01-03"), today()).expect("toggle");

        let timed_out = tokio::time::timeout(Duration::from_millis(20), reconciler.save(&client))
            .await
            .is_err();
        assert!(timed_out);
        assert_eq!(reconciler.status(), FlightStatus::Idle);
        assert!(reconciler.baseline().is_empty());

        let saved = reconciler.save(&client).await.expect("save after cancellation");
        assert_eq!(saved, set(&["2024-01-03"]));
        assert_eq!(client.batch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(reconciler.status(), FlightStatus::Idle);
    }

    #[test]
    fn cancelled_plan_allows_a_new_save() {
        let mut reconciler = SelectionReconciler::new();
        reconciler.toggle(date("2024-01-03"), today()).expect("toggle");

        let plan = reconciler.begin_save().expect("begin").expect("non-empty plan");
        drop(plan);
        reconciler.cancel_save();

        assert_eq!(reconciler.status(), FlightStatus::Idle);
        let replanned = reconciler.begin_save().expect("begin again").expect("plan");
        assert_eq!(replanned.diff().to_add, set(&["2024-01-03"]));
    }

    proptest! {
        #[test]
        fn diff_applied_to_baseline_yields_working(
            baseline_days in proptest::collection::btree_set(0i64..31, 0..12),
            working_days in proptest::collection::btree_set(0i64..31, 0..12),
        ) {
            let start = date("2024-01-01");
            let mut reconciler = SelectionReconciler::new();
            let shift = |offset: &i64| start.add_days(*offset);
            reconciler.baseline = baseline_days.iter().map(shift).collect();
            reconciler.working = working_days.iter().map(shift).collect();

            let diff = reconciler.compute_diff();
            let applied = reconciler.baseline.union(&diff.to_add).difference(&diff.to_remove);

            prop_assert_eq!(&applied, reconciler.working());
            prop_assert!(diff.to_add.iter().all(|day| !diff.to_remove.contains(day)));
            prop_assert_eq!(diff.is_empty(), reconciler.baseline == reconciler.working);
        }
    }
}
