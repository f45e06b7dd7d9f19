use crate::domain::calendar_grid;
use crate::domain::models::{CalendarDate, FertileWindow, PeriodDaySet, YearMonth};
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything the classifier needs to know about the cycle. `today` is passed
/// in explicitly; classification never reads the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleFacts {
    pub period_days: PeriodDaySet,
    pub ovulation_date: Option<CalendarDate>,
    pub fertile_window: Option<FertileWindow>,
    pub symptom_dates: BTreeSet<CalendarDate>,
    pub today: CalendarDate,
    pub target_month: YearMonth,
}

impl CycleFacts {
    pub fn new(today: CalendarDate, target_month: YearMonth) -> Self {
        Self {
            period_days: PeriodDaySet::new(),
            ovulation_date: None,
            fertile_window: None,
            symptom_dates: BTreeSet::new(),
            today,
            target_month,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub date: CalendarDate,
    pub belongs_to_target_month: bool,
    pub is_today: bool,
    pub is_future: bool,
    pub is_period_day: bool,
    pub is_ovulation_day: bool,
    pub is_fertile_day: bool,
    pub has_logged_symptoms: bool,
}

impl CalendarCell {
    /// Future days are reported but must never be offered for selection.
    pub fn is_selectable(&self) -> bool {
        !self.is_future
    }
}

/// The single visual state of a cell when several flags apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayDisplay {
    Selected,
    Today,
    Period,
    Ovulation,
    Fertile,
    Plain,
}

pub fn classify(date: CalendarDate, facts: &CycleFacts) -> CalendarCell {
    CalendarCell {
        date,
        belongs_to_target_month: facts.target_month.contains(date),
        is_today: date == facts.today,
        is_future: date > facts.today,
        is_period_day: facts.period_days.contains(date),
        is_ovulation_day: facts.ovulation_date == Some(date),
        is_fertile_day: facts
            .fertile_window
            .is_some_and(|window| window.contains(date)),
        has_logged_symptoms: facts.symptom_dates.contains(&date),
    }
}

/// Classified cells for the full-week grid of `facts.target_month`.
pub fn classify_month(facts: &CycleFacts) -> Vec<CalendarCell> {
    calendar_grid::build(facts.target_month)
        .into_iter()
        .map(|date| classify(date, facts))
        .collect()
}

/// Precedence: selected > today > period > ovulation > fertile > plain.
pub fn display_state(cell: &CalendarCell, selected: Option<CalendarDate>) -> DayDisplay {
    if selected == Some(cell.date) {
        DayDisplay::Selected
    } else if cell.is_today {
        DayDisplay::Today
    } else if cell.is_period_day {
        DayDisplay::Period
    } else if cell.is_ovulation_day {
        DayDisplay::Ovulation
    } else if cell.is_fertile_day {
        DayDisplay::Fertile
    } else {
        DayDisplay::Plain
    }
}
