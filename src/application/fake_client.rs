use crate::domain::models::{CalendarDate, DateRange, OvulationInfo, PeriodDayRecord, PeriodDaySet};
use crate::domain::symptoms::{DailySymptoms, SymptomEntry};
use crate::infrastructure::cycle_api_client::CycleApiClient;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    ListPeriodDays(DateRange),
    Batch { dates: Vec<CalendarDate>, is_period_day: bool },
    OvulationInfo,
    DailySymptoms(CalendarDate),
    RecordSymptoms(CalendarDate),
    UpdateSymptoms(CalendarDate),
}

#[derive(Debug, Clone)]
pub enum FakeFailure {
    Network,
    Rejected(&'static str, u16),
}

impl FakeFailure {
    fn into_error(self) -> InfraError {
        match self {
            Self::Network => InfraError::Network("connection refused".to_string()),
            Self::Rejected(message, code) => InfraError::remote(message, Some(code)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FakeBatch {
    ConfirmAll,
    /// Only these dates come back confirmed; the rest are silently dropped.
    ConfirmOnly(Vec<CalendarDate>),
    Fail(FakeFailure),
    /// Never answers.
    Hang,
}

/// Scripted stand-in for the remote store. Unscripted calls act on `remote`
/// as a well-behaved server would.
#[derive(Debug, Default)]
pub struct FakeCycleApiClient {
    pub remote: Mutex<PeriodDaySet>,
    pub list_failures: Mutex<VecDeque<FakeFailure>>,
    pub batch_responses: Mutex<VecDeque<FakeBatch>>,
    pub ovulation: Mutex<Option<OvulationInfo>>,
    pub ovulation_failures: Mutex<VecDeque<FakeFailure>>,
    pub symptoms: Mutex<BTreeMap<CalendarDate, SymptomEntry>>,
    pub symptom_failures: Mutex<VecDeque<FakeFailure>>,
    pub calls: Mutex<Vec<FakeCall>>,
    pub list_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl FakeCycleApiClient {
    pub fn with_remote(days: impl IntoIterator<Item = CalendarDate>) -> Self {
        let client = Self::default();
        *client.remote.lock().expect("remote lock") = days.into_iter().collect();
        client
    }

    pub fn script_batches(&self, responses: Vec<FakeBatch>) {
        self.batch_responses.lock().expect("batch lock").extend(responses);
    }

    pub fn fail_next_lists(&self, failures: Vec<FakeFailure>) {
        self.list_failures.lock().expect("list lock").extend(failures);
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn batch_log(&self) -> Vec<(Vec<CalendarDate>, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FakeCall::Batch { dates, is_period_day } => Some((dates, is_period_day)),
                _ => None,
            })
            .collect()
    }

    pub fn remote_days(&self) -> PeriodDaySet {
        self.remote.lock().expect("remote lock").clone()
    }

    fn log(&self, call: FakeCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn apply(&self, date: CalendarDate, is_period_day: bool) -> PeriodDayRecord {
        let mut remote = self.remote.lock().expect("remote lock");
        if is_period_day {
            remote.insert(date);
        } else {
            remote.remove(date);
        }
        record(date, is_period_day)
    }

    fn symptoms_for(date: CalendarDate, entry: SymptomEntry) -> DailySymptoms {
        DailySymptoms {
            id: format!("sym-{date}"),
            user_id: "user-1".to_string(),
            date,
            entry,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn next_failure(queue: &Mutex<VecDeque<FakeFailure>>) -> Option<InfraError> {
        queue
            .lock()
            .expect("failure lock")
            .pop_front()
            .map(FakeFailure::into_error)
    }
}

pub fn record(date: CalendarDate, is_period_day: bool) -> PeriodDayRecord {
    PeriodDayRecord {
        id: format!("pd-{date}"),
        user_id: "user-1".to_string(),
        cycle_id: None,
        date,
        is_period_day,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn date(value: &str) -> CalendarDate {
    CalendarDate::parse(value).expect("valid date")
}

#[async_trait]
impl CycleApiClient for FakeCycleApiClient {
    async fn list_period_days(&self, range: DateRange) -> Result<Vec<PeriodDayRecord>, InfraError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.log(FakeCall::ListPeriodDays(range));
        if let Some(error) = Self::next_failure(&self.list_failures) {
            return Err(error);
        }
        Ok(self
            .remote_days()
            .within(&range)
            .iter()
            .map(|day| record(day, true))
            .collect())
    }

    async fn batch_period_days(
        &self,
        dates: &PeriodDaySet,
        is_period_day: bool,
    ) -> Result<Vec<PeriodDayRecord>, InfraError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.log(FakeCall::Batch {
            dates: dates.iter().collect(),
            is_period_day,
        });

        let scripted = self
            .batch_responses
            .lock()
            .expect("batch lock")
            .pop_front()
            .unwrap_or(FakeBatch::ConfirmAll);

        match scripted {
            FakeBatch::ConfirmAll => Ok(dates
                .iter()
                .map(|day| self.apply(day, is_period_day))
                .collect()),
            FakeBatch::ConfirmOnly(confirmed) => Ok(dates
                .iter()
                .filter(|day| confirmed.contains(day))
                .map(|day| self.apply(day, is_period_day))
                .collect()),
            FakeBatch::Fail(failure) => Err(failure.into_error()),
            FakeBatch::Hang => std::future::pending().await,
        }
    }

    async fn ovulation_info(&self) -> Result<OvulationInfo, InfraError> {
        self.log(FakeCall::OvulationInfo);
        if let Some(error) = Self::next_failure(&self.ovulation_failures) {
            return Err(error);
        }
        Ok(self.ovulation.lock().expect("ovulation lock").clone().unwrap_or_default())
    }

    async fn daily_symptoms(
        &self,
        date: CalendarDate,
    ) -> Result<Option<DailySymptoms>, InfraError> {
        self.log(FakeCall::DailySymptoms(date));
        if let Some(error) = Self::next_failure(&self.symptom_failures) {
            return Err(error);
        }
        Ok(self
            .symptoms
            .lock()
            .expect("symptoms lock")
            .get(&date)
            .cloned()
            .map(|entry| Self::symptoms_for(date, entry)))
    }

    async fn record_daily_symptoms(
        &self,
        date: CalendarDate,
        entry: &SymptomEntry,
    ) -> Result<DailySymptoms, InfraError> {
        self.log(FakeCall::RecordSymptoms(date));
        if let Some(error) = Self::next_failure(&self.symptom_failures) {
            return Err(error);
        }
        self.symptoms
            .lock()
            .expect("symptoms lock")
            .insert(date, entry.clone());
        Ok(Self::symptoms_for(date, entry.clone()))
    }

    async fn update_daily_symptoms(
        &self,
        date: CalendarDate,
        entry: &SymptomEntry,
    ) -> Result<DailySymptoms, InfraError> {
        self.log(FakeCall::UpdateSymptoms(date));
        if let Some(error) = Self::next_failure(&self.symptom_failures) {
            return Err(error);
        }
        self.symptoms
            .lock()
            .expect("symptoms lock")
            .insert(date, entry.clone());
        Ok(Self::symptoms_for(date, entry.clone()))
    }
}
