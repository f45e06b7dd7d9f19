use crate::domain::models::{
    CalendarDate, FertileWindow, OvulationInfo, PeriodDayRecord, PeriodDaySet,
};
use crate::domain::symptoms::{
    BleedingAmount, BleedingColor, DailySymptoms, Emotion, FlowColor, MAX_PAIN_LEVEL, SymptomEntry,
};
use crate::infrastructure::error::InfraError;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct PeriodDayResponse {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<String>,
    pub period_date: String,
    pub is_period_day: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct PeriodDayBatchRequest {
    pub dates: Vec<String>,
    pub is_period_day: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct OvulationInfoResponse {
    #[serde(default)]
    pub estimated_ovulation_date: Option<String>,
    #[serde(default)]
    pub fertile_window_start: Option<String>,
    #[serde(default)]
    pub fertile_window_end: Option<String>,
    #[serde(default)]
    pub is_in_fertile_window: bool,
    #[serde(default)]
    pub days_until_ovulation: Option<i32>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct DailySymptomsRequest {
    pub symptom_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleeding_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleeding_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cravings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_color: Option<String>,
    /// JSON array encoded as a string, e.g. `["feliz","cansado"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotions: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct DailySymptomsResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub symptom_date: Option<String>,
    #[serde(default)]
    pub bleeding_amount: Option<String>,
    #[serde(default)]
    pub bleeding_color: Option<String>,
    #[serde(default)]
    pub pain_level: Option<u8>,
    #[serde(default)]
    pub cravings: Option<String>,
    #[serde(default)]
    pub flow_color: Option<String>,
    #[serde(default)]
    pub emotions: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
}

pub fn decode_period_day(response: &PeriodDayResponse) -> Result<PeriodDayRecord, InfraError> {
    let record = PeriodDayRecord {
        id: response.id.trim().to_string(),
        user_id: response.user_id.trim().to_string(),
        cycle_id: response
            .cycle_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
        date: parse_api_date(&response.period_date, "period_date")?,
        is_period_day: response.is_period_day,
        created_at: response.created_at.clone(),
        updated_at: response.updated_at.clone(),
    };
    record.validate().map_err(InfraError::InvalidPayload)?;
    Ok(record)
}

pub fn decode_period_days(
    responses: &[PeriodDayResponse],
) -> Result<Vec<PeriodDayRecord>, InfraError> {
    responses.iter().map(decode_period_day).collect()
}

/// Dates flagged as period days; records carrying `is_period_day = false` are
/// explicit "not a period day" rows and are dropped.
pub fn period_days_from_records(records: &[PeriodDayRecord]) -> PeriodDaySet {
    records
        .iter()
        .filter(|record| record.is_period_day)
        .map(|record| record.date)
        .collect()
}

pub fn encode_batch(dates: &PeriodDaySet, is_period_day: bool) -> PeriodDayBatchRequest {
    PeriodDayBatchRequest {
        dates: dates.to_api_strings(),
        is_period_day,
    }
}

pub fn decode_ovulation_info(
    response: &OvulationInfoResponse,
) -> Result<OvulationInfo, InfraError> {
    let estimated_ovulation_date = parse_optional_date(
        response.estimated_ovulation_date.as_deref(),
        "estimated_ovulation_date",
    )?;
    let start =
        parse_optional_date(response.fertile_window_start.as_deref(), "fertile_window_start")?;
    let end = parse_optional_date(response.fertile_window_end.as_deref(), "fertile_window_end")?;

    let fertile_window = match (start, end) {
        (Some(start), Some(end)) => {
            Some(FertileWindow::new(start, end).map_err(InfraError::InvalidPayload)?)
        }
        _ => None,
    };

    Ok(OvulationInfo {
        estimated_ovulation_date,
        fertile_window,
        is_in_fertile_window: response.is_in_fertile_window,
        days_until_ovulation: response.days_until_ovulation,
    })
}

pub fn encode_symptoms(date: CalendarDate, entry: &SymptomEntry) -> DailySymptomsRequest {
    DailySymptomsRequest {
        symptom_date: date.to_string(),
        bleeding_amount: entry.bleeding_amount.map(|value| value.as_api_value().to_string()),
        bleeding_color: entry.bleeding_color.map(|value| value.as_api_value().to_string()),
        pain_level: entry.pain_level,
        cravings: entry
            .cravings
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
        flow_color: entry.flow_color.map(|value| value.as_api_value().to_string()),
        emotions: encode_emotions(&entry.emotions),
    }
}

/// Returns `None` when the response lacks identity fields or carries an
/// unparseable date; unknown vocabulary values are dropped field by field.
pub fn decode_daily_symptoms(response: &DailySymptomsResponse) -> Option<DailySymptoms> {
    let id = non_empty(response.id.as_deref())?;
    let user_id = non_empty(response.user_id.as_deref())?;
    let date = CalendarDate::parse(response.symptom_date.as_deref()?).ok()?;
    let created_at = response.created_at.clone()?;
    let updated_at = response.updated_at.clone()?;

    let entry = SymptomEntry {
        bleeding_amount: response
            .bleeding_amount
            .as_deref()
            .and_then(BleedingAmount::from_api_value),
        bleeding_color: response
            .bleeding_color
            .as_deref()
            .and_then(BleedingColor::from_api_value),
        pain_level: response.pain_level.filter(|level| *level <= MAX_PAIN_LEVEL),
        cravings: response.cravings.clone(),
        flow_color: response.flow_color.as_deref().and_then(FlowColor::from_api_value),
        emotions: decode_emotions(response.emotions.as_deref()),
    };

    Some(DailySymptoms {
        id,
        user_id,
        date,
        entry,
        created_at,
        updated_at,
    })
}

pub fn encode_emotions(emotions: &[Emotion]) -> Option<String> {
    if emotions.is_empty() {
        return None;
    }
    let values: Vec<&str> = emotions.iter().map(|emotion| emotion.as_api_value()).collect();
    serde_json::to_string(&values).ok()
}

pub fn decode_emotions(raw: Option<&str>) -> Vec<Emotion> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Vec::new();
    };
    let values: Vec<String> = serde_json::from_str(raw).unwrap_or_else(|_| {
        raw.trim_matches(|c| c == '[' || c == ']')
            .split(',')
            .map(|value| value.trim().trim_matches('"').to_string())
            .collect()
    });
    values
        .iter()
        .filter_map(|value| Emotion::from_api_value(value))
        .collect()
}

/// Server-provided `detail` from an error body, or `fallback`.
pub fn error_message_from_body(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(message) => Some(message),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn parse_api_date(value: &str, field_name: &str) -> Result<CalendarDate, InfraError> {
    CalendarDate::parse(value)
        .map_err(|error| InfraError::InvalidPayload(format!("{field_name}: {error}")))
}

fn parse_optional_date(
    value: Option<&str>,
    field_name: &str,
) -> Result<Option<CalendarDate>, InfraError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse_api_date(value, field_name))
        .transpose()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
