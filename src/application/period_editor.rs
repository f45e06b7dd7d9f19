use crate::application::async_result::{
    result_channel, track, AsyncResult, ResultReceiver, ResultSender,
};
use crate::application::period_reconciler::{FlightStatus, PeriodDiff, SelectionReconciler};
use crate::application::retry::RetryPolicy;
use crate::domain::cycle_classifier::{self, CalendarCell, CycleFacts};
use crate::domain::models::{CalendarDate, DateRange, PeriodDaySet, YearMonth};
use crate::infrastructure::config::{TodayProvider, DEFAULT_EDIT_WINDOW_MONTHS};
use crate::infrastructure::cycle_api_client::CycleApiClient;
use crate::infrastructure::error::InfraError;
use std::sync::Arc;
use tracing::debug;

/// Controller for editing period days a month at a time.
///
/// Loads cover the displayed month widened by `window_months` on each side,
/// so days shown from adjacent months are already known when toggled.
pub struct PeriodEditor<C>
where
    C: CycleApiClient + ?Sized,
{
    client: Arc<C>,
    reconciler: SelectionReconciler,
    displayed_month: YearMonth,
    window_months: u32,
    today_provider: TodayProvider,
    load_results: Option<ResultSender<PeriodDaySet>>,
    save_results: Option<ResultSender<PeriodDaySet>>,
}

impl<C> PeriodEditor<C>
where
    C: CycleApiClient + ?Sized,
{
    pub fn new(client: Arc<C>, today_provider: TodayProvider) -> Self {
        let displayed_month = (today_provider)().year_month();
        Self {
            client,
            reconciler: SelectionReconciler::new(),
            displayed_month,
            window_months: DEFAULT_EDIT_WINDOW_MONTHS,
            today_provider,
            load_results: None,
            save_results: None,
        }
    }

    pub fn with_window_months(mut self, window_months: u32) -> Self {
        self.window_months = window_months;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.reconciler = self.reconciler.with_retry_policy(retry_policy);
        self
    }

    pub fn with_month(mut self, month: YearMonth) -> Self {
        self.displayed_month = month;
        self
    }

    /// Replaces any earlier load subscriber.
    pub fn subscribe_loads(&mut self) -> ResultReceiver<PeriodDaySet> {
        let (sender, receiver) = result_channel();
        self.load_results = Some(sender);
        receiver
    }

    /// Replaces any earlier save subscriber.
    pub fn subscribe_saves(&mut self) -> ResultReceiver<PeriodDaySet> {
        let (sender, receiver) = result_channel();
        self.save_results = Some(sender);
        receiver
    }

    pub fn displayed_month(&self) -> YearMonth {
        self.displayed_month
    }

    pub fn load_window(&self) -> DateRange {
        DateRange::around_month(self.displayed_month, self.window_months)
    }

    pub fn today(&self) -> CalendarDate {
        (self.today_provider)()
    }

    pub fn selection(&self) -> &PeriodDaySet {
        self.reconciler.working()
    }

    pub fn confirmed(&self) -> &PeriodDaySet {
        self.reconciler.baseline()
    }

    pub fn status(&self) -> FlightStatus {
        self.reconciler.status()
    }

    pub fn pending_changes(&self) -> PeriodDiff {
        self.reconciler.compute_diff()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending_changes().is_empty()
    }

    pub async fn open(&mut self) -> AsyncResult<PeriodDaySet> {
        let window = self.load_window();
        debug!(month = %self.displayed_month, %window, "loading period editor window");
        track(
            "load period days",
            self.load_results.clone(),
            self.reconciler.load(window, self.client.as_ref()),
        )
        .await
    }

    pub async fn show_previous_month(&mut self) -> AsyncResult<PeriodDaySet> {
        self.displayed_month = self.displayed_month.previous();
        self.open().await
    }

    pub async fn show_next_month(&mut self) -> AsyncResult<PeriodDaySet> {
        self.displayed_month = self.displayed_month.next();
        self.open().await
    }

    pub fn toggle(&mut self, date: CalendarDate) -> Result<bool, InfraError> {
        let today = self.today();
        self.reconciler.toggle(date, today)
    }

    pub async fn save(&mut self) -> AsyncResult<PeriodDaySet> {
        track(
            "save period days",
            self.save_results.clone(),
            self.reconciler.save(self.client.as_ref()),
        )
        .await
    }

    /// Grid of the displayed month with the working selection as period days.
    pub fn grid(&self) -> Vec<CalendarCell> {
        let mut facts = CycleFacts::new(self.today(), self.displayed_month);
        facts.period_days = self.reconciler.working().clone();
        cycle_classifier::classify_month(&facts)
    }
}
