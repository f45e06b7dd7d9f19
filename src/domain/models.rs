use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// Years a `CalendarDate` or `YearMonth` may carry. The padding weeks of the
/// first and last supported month stay representable.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

fn supported_year(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Plain calendar day. Ordering and equality are by (year, month, day); no
/// timezone is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        if !supported_year(year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        let parsed = NaiveDate::parse_from_str(value.trim(), API_DATE_FORMAT)
            .map_err(|_| format!("'{value}' must be YYYY-MM-DD"))?;
        if !supported_year(parsed.year()) {
            return Err(format!("'{value}' is outside years {MIN_YEAR}..={MAX_YEAR}"));
        }
        Ok(Self(parsed))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// ISO weekday number, Monday = 1 .. Sunday = 7.
    pub fn iso_weekday(self) -> u32 {
        self.0.weekday().number_from_monday()
    }

    /// Month of this date, clamped to the supported years.
    pub fn year_month(self) -> YearMonth {
        YearMonth::from_index(i64::from(self.year()) * 12 + i64::from(self.month()) - 1)
    }

    pub fn checked_add_days(self, days: i64) -> Option<Self> {
        Duration::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
    }

    /// Saturates at the first or last date chrono can represent.
    pub fn add_days(self, days: i64) -> Self {
        self.checked_add_days(days).unwrap_or(if days < 0 {
            Self(NaiveDate::MIN)
        } else {
            Self(NaiveDate::MAX)
        })
    }

    pub fn next_day(self) -> Self {
        self.add_days(1)
    }

    pub fn previous_day(self) -> Self {
        self.add_days(-1)
    }

    pub fn naive(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CalendarDate> for String {
    fn from(value: CalendarDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(API_DATE_FORMAT))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "YearMonthParts")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct YearMonthParts {
    year: i32,
    month: u32,
}

impl TryFrom<YearMonthParts> for YearMonth {
    type Error = String;

    fn try_from(parts: YearMonthParts) -> Result<Self, Self::Error> {
        Self::new(parts.year, parts.month).ok_or_else(|| {
            format!(
                "{}-{:02} is not a month within years {MIN_YEAR}..={MAX_YEAR}",
                parts.year, parts.month
            )
        })
    }
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (supported_year(year) && (1..=12).contains(&month)).then_some(Self { year, month })
    }

    fn index(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_index(index: i64) -> Self {
        let first = i64::from(MIN_YEAR) * 12;
        let last = i64::from(MAX_YEAR) * 12 + 11;
        let index = index.clamp(first, last);
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> CalendarDate {
        CalendarDate(first_of(self.year, self.month))
    }

    pub fn last_day(self) -> CalendarDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        CalendarDate(first_of(year, month)).previous_day()
    }

    pub fn days_in_month(self) -> u32 {
        self.last_day().day()
    }

    /// Saturates at January of `MIN_YEAR` and December of `MAX_YEAR`.
    pub fn plus_months(self, months: i32) -> Self {
        Self::from_index(self.index() + i64::from(months))
    }

    pub fn next(self) -> Self {
        self.plus_months(1)
    }

    pub fn previous(self) -> Self {
        self.plus_months(-1)
    }

    pub fn contains(self, date: CalendarDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn range(self) -> DateRange {
        DateRange {
            start: self.first_day(),
            end: self.last_day(),
        }
    }
}

// Callers pass a supported month or the one after it, both representable.
fn first_of(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive range of calendar days, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateRangeParts")]
pub struct DateRange {
    start: CalendarDate,
    end: CalendarDate,
}

#[derive(Deserialize)]
struct DateRangeParts {
    start: CalendarDate,
    end: CalendarDate,
}

impl TryFrom<DateRangeParts> for DateRange {
    type Error = String;

    fn try_from(parts: DateRangeParts) -> Result<Self, Self::Error> {
        Self::new(parts.start, parts.end)
    }
}

impl DateRange {
    pub fn new(start: CalendarDate, end: CalendarDate) -> Result<Self, String> {
        if end < start {
            return Err(format!("date range end {end} is before start {start}"));
        }
        Ok(Self { start, end })
    }

    /// Months `around` before and after `center`, from the first day of the
    /// earliest month to the last day of the latest one.
    pub fn around_month(center: YearMonth, around: u32) -> Self {
        let around = around as i32;
        Self {
            start: center.plus_months(-around).first_day(),
            end: center.plus_months(around).last_day(),
        }
    }

    pub fn start(&self) -> CalendarDate {
        self.start
    }

    pub fn end(&self) -> CalendarDate {
        self.end
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = CalendarDate> + '_ {
        let end = self.end;
        std::iter::successors(Some(self.start), move |day| {
            (*day < end).then(|| day.next_day())
        })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Set of period days, unique by date and iterated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDaySet {
    days: BTreeSet<CalendarDate>,
}

impl PeriodDaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.days.contains(&date)
    }

    pub fn insert(&mut self, date: CalendarDate) -> bool {
        self.days.insert(date)
    }

    pub fn remove(&mut self, date: CalendarDate) -> bool {
        self.days.remove(&date)
    }

    /// Flips membership and returns whether the date is now included.
    pub fn toggle(&mut self, date: CalendarDate) -> bool {
        if self.days.remove(&date) {
            false
        } else {
            self.days.insert(date);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CalendarDate> + '_ {
        self.days.iter().copied()
    }

    /// Dates in `self` that are not in `other`.
    pub fn difference(&self, other: &PeriodDaySet) -> PeriodDaySet {
        self.days.difference(&other.days).copied().collect()
    }

    pub fn union(&self, other: &PeriodDaySet) -> PeriodDaySet {
        self.days.union(&other.days).copied().collect()
    }

    /// Copy of this set where every date inside `range` comes from `fetched`
    /// and every date outside `range` is kept.
    pub fn replace_range(&self, range: &DateRange, fetched: &PeriodDaySet) -> PeriodDaySet {
        self.iter()
            .filter(|date| !range.contains(*date))
            .chain(fetched.iter().filter(|date| range.contains(*date)))
            .collect()
    }

    pub fn within(&self, range: &DateRange) -> PeriodDaySet {
        self.iter().filter(|date| range.contains(*date)).collect()
    }

    pub fn to_api_strings(&self) -> Vec<String> {
        self.iter().map(|date| date.to_string()).collect()
    }
}

impl FromIterator<CalendarDate> for PeriodDaySet {
    fn from_iter<I: IntoIterator<Item = CalendarDate>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

impl Extend<CalendarDate> for PeriodDaySet {
    fn extend<I: IntoIterator<Item = CalendarDate>>(&mut self, iter: I) {
        self.days.extend(iter);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DateRangeParts")]
pub struct FertileWindow {
    start: CalendarDate,
    end: CalendarDate,
}

impl TryFrom<DateRangeParts> for FertileWindow {
    type Error = String;

    fn try_from(parts: DateRangeParts) -> Result<Self, Self::Error> {
        Self::new(parts.start, parts.end)
    }
}

impl FertileWindow {
    pub fn new(start: CalendarDate, end: CalendarDate) -> Result<Self, String> {
        if end < start {
            return Err(format!(
                "fertile_window.end {end} must not be before fertile_window.start {start}"
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> CalendarDate {
        self.start
    }

    pub fn end(&self) -> CalendarDate {
        self.end
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvulationInfo {
    pub estimated_ovulation_date: Option<CalendarDate>,
    pub fertile_window: Option<FertileWindow>,
    pub is_in_fertile_window: bool,
    pub days_until_ovulation: Option<i32>,
}

/// A period-day row as confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDayRecord {
    pub id: String,
    pub user_id: String,
    pub cycle_id: Option<String>,
    pub date: CalendarDate,
    pub is_period_day: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl PeriodDayRecord {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "period_day.id")?;
        validate_non_empty(&self.user_id, "period_day.user_id")?;
        Ok(())
    }
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
