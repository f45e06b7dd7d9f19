use crate::domain::models::{CalendarDate, YearMonth};

pub const DAYS_PER_WEEK: usize = 7;

/// Days of the previous month shown before the 1st (weeks start on Monday).
pub fn leading_count(month: YearMonth) -> usize {
    ((month.first_day().iso_weekday() + 6) % 7) as usize
}

/// Days of the next month shown after the last day of `month`.
pub fn trailing_count(month: YearMonth) -> usize {
    ((7 - month.last_day().iso_weekday()) % 7) as usize
}

/// Dates of the full Monday-first weeks covering `month`, in order.
///
/// The first date is the Monday on or before the 1st and the last is the
/// Sunday on or after the month's last day, so the length is always a
/// multiple of seven.
pub fn build(month: YearMonth) -> Vec<CalendarDate> {
    let leading = leading_count(month);
    let trailing = trailing_count(month);
    let total = leading + month.days_in_month() as usize + trailing;
    let start = month.first_day().add_days(-(leading as i64));

    std::iter::successors(Some(start), |day| Some(day.next_day()))
        .take(total)
        .collect()
}

/// Splits a grid into rows of seven.
pub fn weeks(grid: &[CalendarDate]) -> impl Iterator<Item = &[CalendarDate]> {
    grid.chunks(DAYS_PER_WEEK)
}
