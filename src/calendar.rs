//! Calendar grid generation and date-range selection for the booking picker

use crate::config::CalendarConfig;
use crate::{BookingError, SearchDomain, TripMode};
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// A calendar day with no time-of-day component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Create a date from a year, a 1-based month and a day of month
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, BookingError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| BookingError::DateParseError(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    /// Today's date on the local clock. Only entry points call this; the
    /// selection logic always receives `today` as an argument.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// 1-based month
    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    pub fn as_naive(self) -> NaiveDate {
        self.0
    }

    /// Whole days from `self` to `other` (negative when `other` is earlier)
    pub fn days_until(self, other: CalendarDate) -> i64 {
        other.0.signed_duration_since(self.0).num_days()
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl FromStr for CalendarDate {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| BookingError::DateParseError(format!("{} ({})", s, e)))
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A displayed month.
///
/// Built from a year and a zero-based month index that may fall outside
/// `0..=11`; the index rolls over into neighbouring years, so callers can
/// ask for `month_index + 1` to get "next month" without special-casing
/// December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month_index: i32) -> Result<Self, BookingError> {
        let out_of_range = || BookingError::DateOutOfRange { year, month_index };

        let total = i64::from(year) * 12 + i64::from(month_index);
        let normalized_year = i32::try_from(total.div_euclid(12)).map_err(|_| out_of_range())?;
        let month = total.rem_euclid(12) as u32 + 1;

        let first = NaiveDate::from_ymd_opt(normalized_year, month, 1).ok_or_else(out_of_range)?;

        // The padded 6-week grid reaches up to 6 days before and 41 days after day 1
        first
            .checked_sub_days(Days::new(6))
            .and(first.checked_add_days(Days::new(41)))
            .ok_or_else(out_of_range)?;

        Ok(Self { first })
    }

    /// The month containing `date`
    pub fn containing(date: CalendarDate) -> Result<Self, BookingError> {
        Self::new(date.year(), date.month() as i32 - 1)
    }

    pub fn year(self) -> i32 {
        self.first.year()
    }

    /// 1-based month
    pub fn month(self) -> u32 {
        self.first.month()
    }

    /// 0-based month
    pub fn month_index(self) -> i32 {
        self.first.month0() as i32
    }

    pub fn first_day(self) -> CalendarDate {
        CalendarDate(self.first)
    }

    pub fn days_in_month(self) -> u32 {
        match self.first.checked_add_months(chrono::Months::new(1)) {
            Some(next) => next.signed_duration_since(self.first).num_days() as u32,
            None => 31,
        }
    }

    pub fn contains(self, date: CalendarDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Move by `months` (negative goes back)
    pub fn offset(self, months: i32) -> Result<Self, BookingError> {
        let month_index = self.month_index().checked_add(months).ok_or(BookingError::DateOutOfRange {
            year: self.year(),
            month_index: i32::MAX,
        })?;
        Self::new(self.year(), month_index)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first.format("%Y-%m"))
    }
}

/// Fixed 6x7 block of consecutive days, Sunday-first, covering one month
/// plus the padding days of its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    month: YearMonth,
    days: Vec<CalendarDate>,
}

impl CalendarGrid {
    pub const WEEKS: usize = 6;
    pub const DAYS_PER_WEEK: usize = 7;
    pub const CELLS: usize = Self::WEEKS * Self::DAYS_PER_WEEK;

    /// Always six rows, even for months that fit in four or five, so the
    /// picker height never changes between months.
    pub fn for_month(month: YearMonth) -> Self {
        let lead = u64::from(month.first.weekday().num_days_from_sunday());
        // YearMonth::new guarantees room for the padding on both sides
        let start = month.first.checked_sub_days(Days::new(lead)).unwrap_or(month.first);

        let days: Vec<CalendarDate> = start.iter_days().take(Self::CELLS).map(CalendarDate).collect();

        trace!(month = %month, grid_start = %start, cells = days.len(), "Generated calendar grid");

        Self { month, days }
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    /// All 42 days in row-major order
    pub fn days(&self) -> &[CalendarDate] {
        &self.days
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDate]> {
        self.days.chunks(Self::DAYS_PER_WEEK)
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        match (self.days.first(), self.days.last()) {
            (Some(first), Some(last)) => *first <= date && date <= *last,
            _ => false,
        }
    }
}

/// Build the grid for `(year, month_index)`, with `month_index` zero-based
/// and normalized across year boundaries.
pub fn generate_grid(year: i32, month_index: i32) -> Result<CalendarGrid, BookingError> {
    YearMonth::new(year, month_index).map(CalendarGrid::for_month)
}

/// A start/end pair where `end` never exists without `start` and never
/// precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: Option<CalendarDate>,
    end: Option<CalendarDate>,
}

#[derive(Deserialize)]
struct RawDateRange {
    #[serde(default)]
    start: Option<CalendarDate>,
    #[serde(default)]
    end: Option<CalendarDate>,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = BookingError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub const fn empty() -> Self {
        Self { start: None, end: None }
    }

    /// Half-complete range waiting for an end date
    pub const fn starting(start: CalendarDate) -> Self {
        Self { start: Some(start), end: None }
    }

    /// Build a range, swapping a reversed pair. An end without a start is
    /// rejected.
    pub fn new(start: Option<CalendarDate>, end: Option<CalendarDate>) -> Result<Self, BookingError> {
        match (start, end) {
            (None, Some(end)) => Err(BookingError::ParseError(format!(
                "date range has end {} without a start",
                end
            ))),
            (Some(start), Some(end)) if end < start => Ok(Self {
                start: Some(end),
                end: Some(start),
            }),
            (start, end) => Ok(Self { start, end }),
        }
    }

    pub fn start(&self) -> Option<CalendarDate> {
        self.start
    }

    pub fn end(&self) -> Option<CalendarDate> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Start chosen, end still open
    pub fn is_awaiting_end(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    /// Inclusive on both ends
    pub fn contains(&self, date: CalendarDate) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= date && date <= end,
            (Some(start), None) => start == date,
            _ => false,
        }
    }

    /// Number of nights between check-in and check-out
    pub fn nights(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(start.days_until(end)),
            _ => None,
        }
    }
}

/// Outcome of a date click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub range: DateRange,
    /// The pick is finished and the picker can close
    pub complete: bool,
}

/// Resolve a click on `clicked` into the next range.
///
/// Past dates are inert and return `range` untouched. Hotel searches always
/// pick a pair. In round-trip mode a click before the chosen start swaps
/// the pair instead of rejecting it.
pub fn select_date(
    range: DateRange,
    clicked: CalendarDate,
    trip_mode: TripMode,
    domain: SearchDomain,
    today: CalendarDate,
) -> Selection {
    if clicked < today {
        debug!(clicked = %clicked, today = %today, "Ignoring click on past date");
        return Selection { range, complete: false };
    }

    let mode = domain.effective_trip_mode(trip_mode);
    let selection = match mode {
        TripMode::OneWay => Selection {
            range: DateRange::starting(clicked),
            complete: true,
        },
        TripMode::RoundTrip => match (range.start, range.end) {
            (Some(start), None) if clicked >= start => Selection {
                range: DateRange {
                    start: Some(start),
                    end: Some(clicked),
                },
                complete: true,
            },
            (Some(start), None) => {
                debug!(start = %start, clicked = %clicked, "Click before start, swapping range");
                Selection {
                    range: DateRange {
                        start: Some(clicked),
                        end: Some(start),
                    },
                    complete: true,
                }
            }
            _ => Selection {
                range: DateRange::starting(clicked),
                complete: false,
            },
        },
    };

    debug!(
        mode = %mode,
        domain = %domain,
        start = ?selection.range.start,
        end = ?selection.range.end,
        complete = selection.complete,
        "Date selected"
    );
    selection
}

/// Whether the picker should let the user click `date`.
///
/// Past days are always disabled. While a round-trip pick is waiting for
/// its end date, days before the start are disabled too.
pub fn is_selectable(
    date: CalendarDate,
    range: &DateRange,
    trip_mode: TripMode,
    domain: SearchDomain,
    today: CalendarDate,
) -> bool {
    if date < today {
        return false;
    }

    match (domain.effective_trip_mode(trip_mode), range.start, range.end) {
        (TripMode::RoundTrip, Some(start), None) => date >= start,
        _ => true,
    }
}

/// Render flags for one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayState {
    pub date: CalendarDate,
    /// Belongs to the displayed month rather than the padding
    pub in_month: bool,
    pub is_today: bool,
    pub disabled: bool,
    pub is_start: bool,
    pub is_end: bool,
    /// Strictly between start and end
    pub in_range: bool,
}

pub fn day_state(
    date: CalendarDate,
    month: YearMonth,
    range: &DateRange,
    trip_mode: TripMode,
    domain: SearchDomain,
    today: CalendarDate,
) -> DayState {
    let in_range = match (range.start, range.end) {
        (Some(start), Some(end)) => start < date && date < end,
        _ => false,
    };

    DayState {
        date,
        in_month: month.contains(date),
        is_today: date == today,
        disabled: !is_selectable(date, range, trip_mode, domain, today),
        is_start: range.start == Some(date),
        is_end: range.end == Some(date),
        in_range,
    }
}

/// Displayed-month cursor bounded by the current month and a horizon of
/// `max_years_ahead` years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthNavigator {
    anchor: YearMonth,
    earliest: YearMonth,
    latest: YearMonth,
    visible_months: u32,
}

impl MonthNavigator {
    /// Navigator opened on the month containing `today`
    pub fn new(today: CalendarDate, config: &CalendarConfig) -> Result<Self, BookingError> {
        Self::starting_at(YearMonth::containing(today)?, today, config)
    }

    /// Navigator opened on `anchor`, clamped into the allowed window
    pub fn starting_at(
        anchor: YearMonth,
        today: CalendarDate,
        config: &CalendarConfig,
    ) -> Result<Self, BookingError> {
        let earliest = YearMonth::containing(today)?;
        let horizon = i32::try_from(config.max_years_ahead.saturating_mul(12)).unwrap_or(i32::MAX);
        let latest = earliest.offset(horizon)?;

        Ok(Self {
            anchor: anchor.clamp(earliest, latest),
            earliest,
            latest,
            visible_months: config.visible_months.max(1),
        })
    }

    pub fn anchor(&self) -> YearMonth {
        self.anchor
    }

    pub fn earliest(&self) -> YearMonth {
        self.earliest
    }

    pub fn latest(&self) -> YearMonth {
        self.latest
    }

    pub fn can_go_prev(&self) -> bool {
        self.anchor > self.earliest
    }

    pub fn can_go_next(&self) -> bool {
        self.anchor < self.latest
    }

    /// One month back; unchanged at the current month
    pub fn prev_month(self) -> Self {
        if !self.can_go_prev() {
            debug!(anchor = %self.anchor, "Already at earliest month");
            return self;
        }
        self.moved(-1)
    }

    /// One month forward; unchanged at the horizon
    pub fn next_month(self) -> Self {
        if !self.can_go_next() {
            debug!(anchor = %self.anchor, "Already at latest month");
            return self;
        }
        self.moved(1)
    }

    fn moved(self, months: i32) -> Self {
        match self.anchor.offset(months) {
            Ok(anchor) => Self { anchor, ..self },
            Err(_) => self,
        }
    }

    /// Grids for the anchor month and the months shown beside it
    pub fn visible_grids(&self) -> Vec<CalendarGrid> {
        (0..self.visible_months as i32)
            .filter_map(|i| self.anchor.offset(i).ok())
            .map(CalendarGrid::for_month)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> CalendarDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_calendar_date_parsing() {
        let d = date("2025-06-10");
        assert_eq!((d.year(), d.month(), d.day()), (2025, 6, 10));
        assert_eq!(d.to_string(), "2025-06-10");
        assert!("2025-13-01".parse::<CalendarDate>().is_err());
        assert!("10/06/2025".parse::<CalendarDate>().is_err());
        assert!(CalendarDate::from_ymd(2025, 2, 29).is_err());
    }

    #[test]
    fn test_year_month_rollover() {
        let next = YearMonth::new(2025, 12).unwrap();
        assert_eq!((next.year(), next.month()), (2026, 1));

        let prev = YearMonth::new(2025, -1).unwrap();
        assert_eq!((prev.year(), prev.month()), (2024, 12));

        let far = YearMonth::new(2025, 25).unwrap();
        assert_eq!((far.year(), far.month()), (2027, 2));
    }

    #[test]
    fn test_year_month_out_of_range() {
        assert!(matches!(
            YearMonth::new(i32::MAX, 0),
            Err(BookingError::DateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(YearMonth::new(2024, 1).unwrap().days_in_month(), 29);
        assert_eq!(YearMonth::new(2025, 1).unwrap().days_in_month(), 28);
        assert_eq!(YearMonth::new(2025, 11).unwrap().days_in_month(), 31);
    }

    #[test]
    fn test_grid_starts_on_preceding_sunday() {
        // 2025-01-01 is a Wednesday
        let grid = generate_grid(2025, 0).unwrap();
        assert_eq!(grid.days()[0], date("2024-12-29"));
        assert_eq!(grid.days()[0].weekday(), Weekday::Sun);
        assert_eq!(grid.days()[3], date("2025-01-01"));
    }

    #[test]
    fn test_grid_month_starting_on_sunday() {
        // 2026-02-01 is a Sunday and February 2026 fits in exactly four weeks
        let grid = generate_grid(2026, 1).unwrap();
        assert_eq!(grid.days()[0], date("2026-02-01"));
        assert_eq!(grid.weeks().count(), 6);
        assert_eq!(*grid.days().last().unwrap(), date("2026-03-14"));
    }

    #[test]
    fn test_grid_rollover_matches_explicit_month() {
        assert_eq!(generate_grid(2025, 12).unwrap(), generate_grid(2026, 0).unwrap());
    }

    #[test]
    fn test_date_range_swaps_reversed_pair() {
        let range = DateRange::new(Some(date("2025-06-10")), Some(date("2025-06-05"))).unwrap();
        assert_eq!(range.start(), Some(date("2025-06-05")));
        assert_eq!(range.end(), Some(date("2025-06-10")));
        assert_eq!(range.nights(), Some(5));
    }

    #[test]
    fn test_date_range_rejects_end_only() {
        assert!(DateRange::new(None, Some(date("2025-06-10"))).is_err());
        let json = r#"{"start": null, "end": "2025-06-10"}"#;
        assert!(serde_json::from_str::<DateRange>(json).is_err());
    }

    #[test]
    fn test_date_range_json() {
        let range = DateRange::new(Some(date("2025-06-10")), Some(date("2025-06-12"))).unwrap();
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"start":"2025-06-10","end":"2025-06-12"}"#);
        let empty: DateRange = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_round_trip_state_machine() {
        let today = date("2025-06-01");
        let first = select_date(DateRange::empty(), date("2025-06-10"), TripMode::RoundTrip, SearchDomain::Flight, today);
        assert!(!first.complete);
        assert!(first.range.is_awaiting_end());

        let second = select_date(first.range, date("2025-06-15"), TripMode::RoundTrip, SearchDomain::Flight, today);
        assert!(second.complete);
        assert_eq!(second.range.end(), Some(date("2025-06-15")));

        // A third click starts over
        let third = select_date(second.range, date("2025-06-20"), TripMode::RoundTrip, SearchDomain::Flight, today);
        assert!(!third.complete);
        assert_eq!(third.range, DateRange::starting(date("2025-06-20")));
    }

    #[test]
    fn test_same_day_round_trip() {
        let today = date("2025-06-01");
        let range = DateRange::starting(date("2025-06-10"));
        let picked = select_date(range, date("2025-06-10"), TripMode::RoundTrip, SearchDomain::Flight, today);
        assert!(picked.complete);
        assert_eq!(picked.range.nights(), Some(0));
    }

    #[test]
    fn test_hotel_ignores_one_way_toggle() {
        let today = date("2025-06-01");
        let picked = select_date(DateRange::empty(), date("2025-06-10"), TripMode::OneWay, SearchDomain::Hotel, today);
        assert!(!picked.complete);
        assert!(picked.range.is_awaiting_end());
    }

    #[test]
    fn test_today_is_selectable() {
        let today = date("2025-06-01");
        let picked = select_date(DateRange::empty(), today, TripMode::OneWay, SearchDomain::Flight, today);
        assert!(picked.complete);
        assert_eq!(picked.range.start(), Some(today));
    }

    #[test]
    fn test_is_selectable_disables_before_start() {
        let today = date("2025-06-01");
        let range = DateRange::starting(date("2025-06-10"));
        assert!(!is_selectable(date("2025-06-05"), &range, TripMode::RoundTrip, SearchDomain::Flight, today));
        assert!(is_selectable(date("2025-06-10"), &range, TripMode::RoundTrip, SearchDomain::Flight, today));
        assert!(is_selectable(date("2025-06-05"), &range, TripMode::OneWay, SearchDomain::Flight, today));
        assert!(!is_selectable(date("2025-06-05"), &range, TripMode::OneWay, SearchDomain::Hotel, today));
        assert!(!is_selectable(date("2025-05-31"), &DateRange::empty(), TripMode::OneWay, SearchDomain::Flight, today));
    }

    #[test]
    fn test_day_state_flags() {
        let today = date("2025-06-01");
        let month = YearMonth::new(2025, 5).unwrap();
        let range = DateRange::new(Some(date("2025-06-10")), Some(date("2025-06-12"))).unwrap();

        let start = day_state(date("2025-06-10"), month, &range, TripMode::RoundTrip, SearchDomain::Hotel, today);
        assert!(start.is_start && !start.in_range && !start.disabled);

        let middle = day_state(date("2025-06-11"), month, &range, TripMode::RoundTrip, SearchDomain::Hotel, today);
        assert!(middle.in_range);

        let padding = day_state(date("2025-07-01"), month, &range, TripMode::RoundTrip, SearchDomain::Hotel, today);
        assert!(!padding.in_month);

        let past = day_state(date("2025-05-31"), month, &range, TripMode::RoundTrip, SearchDomain::Hotel, today);
        assert!(past.disabled);
    }

    #[test]
    fn test_navigator_bounds() {
        let today = date("2025-06-18");
        let config = CalendarConfig::default();
        let nav = MonthNavigator::new(today, &config).unwrap();

        assert!(!nav.can_go_prev());
        assert_eq!(nav.prev_month(), nav);

        let mut moved = nav;
        for _ in 0..30 {
            moved = moved.next_month();
        }
        assert_eq!((moved.anchor().year(), moved.anchor().month()), (2027, 6));
        assert!(!moved.can_go_next());
        assert_eq!(moved.next_month(), moved);
        assert_eq!(moved.prev_month().anchor().month(), 5);
    }

    #[test]
    fn test_navigator_clamps_initial_anchor() {
        let today = date("2025-06-18");
        let config = CalendarConfig::default();
        let past = YearMonth::new(2020, 0).unwrap();
        let nav = MonthNavigator::starting_at(past, today, &config).unwrap();
        assert_eq!(nav.anchor(), YearMonth::containing(today).unwrap());
    }

    #[test]
    fn test_visible_grids_cross_year() {
        let today = date("2025-12-05");
        let nav = MonthNavigator::new(today, &CalendarConfig::default()).unwrap();
        let grids = nav.visible_grids();
        assert_eq!(grids.len(), 2);
        assert_eq!((grids[1].month().year(), grids[1].month().month()), (2026, 1));
    }
}
