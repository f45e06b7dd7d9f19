use crate::application::async_result::{
    result_channel, track, AsyncResult, ResultReceiver, ResultSender,
};
use crate::application::retry::RetryPolicy;
use crate::domain::cycle_classifier::{self, CalendarCell, CycleFacts, DayDisplay};
use crate::domain::models::{CalendarDate, OvulationInfo, PeriodDaySet, YearMonth};
use crate::domain::symptoms::{DailySymptoms, SymptomEntry};
use crate::infrastructure::config::TodayProvider;
use crate::infrastructure::cycle_api_client::CycleApiClient;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::period_day_mapper;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Read-mostly month calendar: period days, ovulation facts and symptom logs
/// for one month at a time, plus the currently selected day.
pub struct CycleOverview<C>
where
    C: CycleApiClient + ?Sized,
{
    client: Arc<C>,
    today_provider: TodayProvider,
    retry_policy: RetryPolicy,
    month: YearMonth,
    period_days: PeriodDaySet,
    ovulation: OvulationInfo,
    symptom_dates: BTreeSet<CalendarDate>,
    selected: Option<CalendarDate>,
    selected_symptoms: Option<DailySymptoms>,
    month_results: Option<ResultSender<PeriodDaySet>>,
    symptom_results: Option<ResultSender<Option<DailySymptoms>>>,
}

impl<C> CycleOverview<C>
where
    C: CycleApiClient + ?Sized,
{
    pub fn new(client: Arc<C>, today_provider: TodayProvider) -> Self {
        let month = (today_provider)().year_month();
        Self {
            client,
            today_provider,
            retry_policy: RetryPolicy::default(),
            month,
            period_days: PeriodDaySet::new(),
            ovulation: OvulationInfo::default(),
            symptom_dates: BTreeSet::new(),
            selected: None,
            selected_symptoms: None,
            month_results: None,
            symptom_results: None,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn subscribe_months(&mut self) -> ResultReceiver<PeriodDaySet> {
        let (sender, receiver) = result_channel();
        self.month_results = Some(sender);
        receiver
    }

    pub fn subscribe_symptoms(&mut self) -> ResultReceiver<Option<DailySymptoms>> {
        let (sender, receiver) = result_channel();
        self.symptom_results = Some(sender);
        receiver
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn period_days(&self) -> &PeriodDaySet {
        &self.period_days
    }

    pub fn ovulation(&self) -> &OvulationInfo {
        &self.ovulation
    }

    pub fn selected(&self) -> Option<CalendarDate> {
        self.selected
    }

    pub fn selected_symptoms(&self) -> Option<&DailySymptoms> {
        self.selected_symptoms.as_ref()
    }

    pub fn has_logged_symptoms(&self, date: CalendarDate) -> bool {
        self.symptom_dates.contains(&date)
    }

    /// Period days for exactly `month`, then ovulation info. Ovulation is
    /// optional: its failure is logged and leaves the facts empty.
    pub async fn load_month(&mut self, month: YearMonth) -> AsyncResult<PeriodDaySet> {
        let sender = self.month_results.clone();
        track("load month", sender, self.fetch_month(month)).await
    }

    async fn fetch_month(&mut self, month: YearMonth) -> Result<PeriodDaySet, InfraError> {
        let range = month.range();
        let client = self.client.as_ref();
        let records = self
            .retry_policy
            .run("list period days", move || client.list_period_days(range))
            .await?;

        self.month = month;
        self.period_days = period_day_mapper::period_days_from_records(&records).within(&range);

        match self
            .retry_policy
            .run("ovulation info", move || client.ovulation_info())
            .await
        {
            Ok(info) => self.ovulation = info,
            Err(error) => {
                warn!(%error, "ovulation info unavailable; showing calendar without it");
                self.ovulation = OvulationInfo::default();
            }
        }

        info!(%month, period_days = self.period_days.len(), "month loaded");
        Ok(self.period_days.clone())
    }

    /// Selects a past or present day and loads its symptoms.
    pub async fn select_date(
        &mut self,
        date: CalendarDate,
    ) -> Result<AsyncResult<Option<DailySymptoms>>, InfraError> {
        let today = (self.today_provider)();
        if date > today {
            return Err(InfraError::InvariantViolation(format!(
                "cannot select future date {date} (today is {today})"
            )));
        }
        self.selected = Some(date);
        self.selected_symptoms = None;

        let client = self.client.as_ref();
        let result = track(
            "load symptoms",
            self.symptom_results.clone(),
            client.daily_symptoms(date),
        )
        .await;

        if let AsyncResult::Success(symptoms) = &result {
            if symptoms.is_some() {
                self.symptom_dates.insert(date);
            }
            self.selected_symptoms = symptoms.clone();
        }
        Ok(result)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.selected_symptoms = None;
    }

    /// Creates or updates the selected day's symptoms. On success the day
    /// is flagged as having logged symptoms.
    pub async fn record_symptoms(
        &mut self,
        entry: SymptomEntry,
    ) -> Result<AsyncResult<DailySymptoms>, InfraError> {
        let date = self
            .selected
            .ok_or_else(|| InfraError::InvariantViolation("no day selected".to_string()))?;
        entry.validate().map_err(InfraError::InvariantViolation)?;

        let client = self.client.as_ref();
        let existing = self
            .selected_symptoms
            .as_ref()
            .is_some_and(|symptoms| symptoms.date == date);
        let result = if existing {
            track("update symptoms", None, client.update_daily_symptoms(date, &entry)).await
        } else {
            track("record symptoms", None, client.record_daily_symptoms(date, &entry)).await
        };

        if let AsyncResult::Success(symptoms) = &result {
            self.symptom_dates.insert(date);
            self.selected_symptoms = Some(symptoms.clone());
        }
        Ok(result)
    }

    pub fn facts(&self) -> CycleFacts {
        let mut facts = CycleFacts::new((self.today_provider)(), self.month);
        facts.period_days = self.period_days.clone();
        facts.ovulation_date = self.ovulation.estimated_ovulation_date;
        facts.fertile_window = self.ovulation.fertile_window;
        facts.symptom_dates = self.symptom_dates.clone();
        facts
    }

    pub fn cells(&self) -> Vec<CalendarCell> {
        cycle_classifier::classify_month(&self.facts())
    }

    pub fn display_state(&self, cell: &CalendarCell) -> DayDisplay {
        cycle_classifier::display_state(cell, self.selected)
    }
}
