use crate::domain::models::{CalendarDate, DateRange, OvulationInfo, PeriodDayRecord, PeriodDaySet};
use crate::domain::symptoms::{DailySymptoms, SymptomEntry};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::period_day_mapper::{
    self, DailySymptomsResponse, OvulationInfoResponse, PeriodDayResponse,
};
use crate::infrastructure::session_store::SessionStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait CycleApiClient: Send + Sync {
    async fn list_period_days(&self, range: DateRange) -> Result<Vec<PeriodDayRecord>, InfraError>;

    /// Applies one flag to every date; returns the records the store confirmed.
    async fn batch_period_days(
        &self,
        dates: &PeriodDaySet,
        is_period_day: bool,
    ) -> Result<Vec<PeriodDayRecord>, InfraError>;

    async fn ovulation_info(&self) -> Result<OvulationInfo, InfraError>;

    async fn daily_symptoms(&self, date: CalendarDate) -> Result<Option<DailySymptoms>, InfraError>;

    async fn record_daily_symptoms(
        &self,
        date: CalendarDate,
        entry: &SymptomEntry,
    ) -> Result<DailySymptoms, InfraError>;

    async fn update_daily_symptoms(
        &self,
        date: CalendarDate,
        entry: &SymptomEntry,
    ) -> Result<DailySymptoms, InfraError>;
}

#[derive(Clone)]
pub struct ReqwestCycleApiClient {
    client: Client,
    base_url: Url,
    session_store: Arc<dyn SessionStore>,
}

impl ReqwestCycleApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self, InfraError> {
        let base_url = Self::parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                InfraError::InvalidConfig(format!("failed to build http client: {error}"))
            })?;
        Ok(Self {
            client,
            base_url,
            session_store,
        })
    }

    pub fn from_config(
        config: &AppConfig,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self, InfraError> {
        Self::new(&config.api_base_url, config.request_timeout(), session_store)
    }

    fn parse_base_url(value: &str) -> Result<Url, InfraError> {
        let url = Url::parse(value.trim())
            .map_err(|error| InfraError::InvalidConfig(format!("invalid api base url: {error}")))?;
        if url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "api base url cannot be a base: {value}"
            )));
        }
        Ok(url)
    }

    fn endpoint(base_url: &Url, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("api base url cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn http_error(status: StatusCode, body: &str, fallback: &str) -> InfraError {
        InfraError::remote(
            period_day_mapper::error_message_from_body(body, fallback),
            Some(status.as_u16()),
        )
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, InfraError> {
        let session = self.session_store.load_session()?;
        Ok(match session.as_ref().and_then(|session| session.bearer_token()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<(StatusCode, String), InfraError> {
        let response = self
            .authorize(request)?
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("{operation}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| {
                InfraError::Network(format!("{operation}: failed reading response: {error}"))
            })?;
        debug!(operation, status = status.as_u16(), "cycle api response");
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
        fallback: &str,
    ) -> Result<T, InfraError> {
        let (status, body) = self.send(request, operation).await?;
        if !status.is_success() {
            return Err(Self::http_error(status, &body, fallback));
        }
        parse_body(&body, operation)
    }

    fn symptoms_from_response(
        response: &DailySymptomsResponse,
        operation: &str,
    ) -> Result<DailySymptoms, InfraError> {
        period_day_mapper::decode_daily_symptoms(response).ok_or_else(|| {
            InfraError::InvalidPayload(format!("{operation}: response is missing identity fields"))
        })
    }
}

fn parse_body<T: DeserializeOwned>(body: &str, operation: &str) -> Result<T, InfraError> {
    serde_json::from_str(body)
        .map_err(|error| InfraError::InvalidPayload(format!("{operation}: {error}; body={body}")))
}

#[async_trait]
impl CycleApiClient for ReqwestCycleApiClient {
    async fn list_period_days(&self, range: DateRange) -> Result<Vec<PeriodDayRecord>, InfraError> {
        let endpoint = Self::endpoint(&self.base_url, &["cycle", "period-days"])?;
        let request = self.client.get(endpoint).query(&[
            ("start_date", range.start().to_string()),
            ("end_date", range.end().to_string()),
        ]);
        let responses: Vec<PeriodDayResponse> = self
            .send_json(request, "list period days", "failed to load period days")
            .await?;
        period_day_mapper::decode_period_days(&responses)
    }

    async fn batch_period_days(
        &self,
        dates: &PeriodDaySet,
        is_period_day: bool,
    ) -> Result<Vec<PeriodDayRecord>, InfraError> {
        if dates.is_empty() {
            return Err(InfraError::InvariantViolation(
                "period day batch must contain at least one date".to_string(),
            ));
        }
        let endpoint = Self::endpoint(&self.base_url, &["cycle", "period-days", "batch"])?;
        let request = self
            .client
            .post(endpoint)
            .json(&period_day_mapper::encode_batch(dates, is_period_day));
        let responses: Vec<PeriodDayResponse> = self
            .send_json(request, "batch period days", "failed to save period days")
            .await?;
        period_day_mapper::decode_period_days(&responses)
    }

    async fn ovulation_info(&self) -> Result<OvulationInfo, InfraError> {
        let endpoint = Self::endpoint(&self.base_url, &["cycle", "ovulation"])?;
        let request = self.client.get(endpoint);
        let response: OvulationInfoResponse = self
            .send_json(request, "ovulation info", "failed to load ovulation info")
            .await?;
        period_day_mapper::decode_ovulation_info(&response)
    }

    async fn daily_symptoms(
        &self,
        date: CalendarDate,
    ) -> Result<Option<DailySymptoms>, InfraError> {
        let date_segment = date.to_string();
        let endpoint = Self::endpoint(&self.base_url, &["cycle", "symptoms", &date_segment])?;
        let (status, body) = self.send(self.client.get(endpoint), "daily symptoms").await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::http_error(status, &body, "failed to load symptoms"));
        }
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        let response: DailySymptomsResponse = parse_body(&body, "daily symptoms")?;
        Ok(period_day_mapper::decode_daily_symptoms(&response))
    }

    async fn record_daily_symptoms(
        &self,
        date: CalendarDate,
        entry: &SymptomEntry,
    ) -> Result<DailySymptoms, InfraError> {
        entry.validate().map_err(InfraError::InvariantViolation)?;
        let endpoint = Self::endpoint(&self.base_url, &["cycle", "symptoms"])?;
        let request = self
            .client
            .post(endpoint)
            .json(&period_day_mapper::encode_symptoms(date, entry));
        let response: DailySymptomsResponse = self
            .send_json(request, "record symptoms", "failed to save symptoms")
            .await?;
        Self::symptoms_from_response(&response, "record symptoms")
    }

    async fn update_daily_symptoms(
        &self,
        date: CalendarDate,
        entry: &SymptomEntry,
    ) -> Result<DailySymptoms, InfraError> {
        entry.validate().map_err(InfraError::InvariantViolation)?;
        let date_segment = date.to_string();
        let endpoint = Self::endpoint(&self.base_url, &["cycle", "symptoms", &date_segment])?;
        let request = self
            .client
            .put(endpoint)
            .json(&period_day_mapper::encode_symptoms(date, entry));
        let response: DailySymptomsResponse = self
            .send_json(request, "update symptoms", "failed to update symptoms")
            .await?;
        Self::symptoms_from_response(&response, "update symptoms")
    }
}
