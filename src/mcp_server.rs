// src/mcp_server.rs

use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use rust_booking::{
    add_room, aggregate, day_state, distribute_flat, remove_room, search_payload, select_date,
    set_child_age, update_room_guests, BookingConfig, BookingError, CalendarDate, DateRange, DayState,
    GuestField, GuestStep, MonthNavigator, PersistedGuests, RoomGuestSpec, SearchDomain, TripMode,
    YearMonth,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable pointing at an optional TOML configuration file
const CONFIG_ENV: &str = "RUST_BOOKING_CONFIG";

/// Booking picker MCP server
#[derive(Default, Clone)]
pub struct BookingServer {
    config: BookingConfig,
}

impl BookingServer {
    pub fn new(config: BookingConfig) -> Self {
        Self { config }
    }

    /// Initialize logging to file
    fn init_logging() -> Result<()> {
        let log_dir = PathBuf::from("logs");
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "rust-booking-mcp.log");

        tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info"))
                    .add_directive("rust_booking=debug".parse()?)
                    .add_directive("rust_booking_mcp=debug".parse()?),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .init();

        info!("Logging initialized - logs will be written to logs/rust-booking-mcp.log.*");
        Ok(())
    }

    fn load_config() -> Result<BookingConfig, BookingError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                info!(path = path, "Loading configuration");
                BookingConfig::from_file(path)
            }
            Err(_) => Ok(BookingConfig::default()),
        }
    }
}

/// Shared date-picker state passed with each calendar call
#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct PickerState {
    #[schemars(description = "Selected start date (departure or check-in) in YYYY-MM-DD format")]
    pub start: Option<String>,
    #[schemars(description = "Selected end date (return or check-out) in YYYY-MM-DD format")]
    pub end: Option<String>,
    #[schemars(description = "Trip type: one-way or round-trip (default: round-trip)")]
    pub trip_type: Option<String>,
    #[schemars(description = "Search domain: flight or hotel (default: flight). Hotel always picks a date pair")]
    pub domain: Option<String>,
    #[schemars(description = "Today's date in YYYY-MM-DD format (default: server's local date)")]
    pub today: Option<String>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct CalendarMonthParams {
    #[schemars(description = "Year of the first displayed month (default: current year)")]
    pub year: Option<i32>,
    #[schemars(description = "First displayed month, 1-12; values outside roll over into adjacent years")]
    pub month: Option<i32>,
    #[serde(flatten)]
    pub state: PickerState,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct NavigateMonthParams {
    #[schemars(description = "Year of the currently displayed month")]
    pub year: i32,
    #[schemars(description = "Currently displayed month, 1-12")]
    pub month: i32,
    #[schemars(description = "Direction: prev or next")]
    pub direction: String,
    #[schemars(description = "Today's date in YYYY-MM-DD format (default: server's local date)")]
    pub today: Option<String>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct SelectDateParams {
    #[schemars(description = "Clicked date in YYYY-MM-DD format")]
    pub date: String,
    #[serde(flatten)]
    pub state: PickerState,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct DistributeGuestsParams {
    #[schemars(description = "Total number of adults")]
    pub adults: u32,
    #[schemars(description = "Total number of children")]
    pub children: Option<u32>,
    #[schemars(description = "Number of rooms (at least 1)")]
    pub room_count: u32,
    #[schemars(description = "Known child ages, assigned to rooms in order")]
    pub child_ages: Option<Vec<u32>>,
}

/// Room occupancy as sent by the caller
#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct RoomInput {
    #[schemars(description = "Adults in the room (at least 1)")]
    pub adults: u32,
    #[schemars(description = "Children in the room")]
    pub children: u32,
    #[schemars(description = "One age per child")]
    pub child_ages: Option<Vec<u32>>,
}

impl From<RoomInput> for RoomGuestSpec {
    fn from(input: RoomInput) -> Self {
        RoomGuestSpec {
            adults: input.adults,
            children: input.children,
            child_ages: input.child_ages.unwrap_or_default(),
        }
        .normalized()
    }
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct EditRoomsParams {
    #[schemars(description = "Current rooms (default: a single room with one adult)")]
    pub rooms: Option<Vec<RoomInput>>,
    #[schemars(description = "Action: add_room, remove_room, update_guests or set_child_age")]
    pub action: String,
    #[schemars(description = "Room index for remove_room, update_guests and set_child_age")]
    pub room_index: Option<usize>,
    #[schemars(description = "Guest field for update_guests: adults or children")]
    pub field: Option<String>,
    #[schemars(description = "Step for update_guests: increment or decrement")]
    pub step: Option<String>,
    #[schemars(description = "Child index for set_child_age")]
    pub child_index: Option<usize>,
    #[schemars(description = "Age for set_child_age")]
    pub age: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct LoadGuestRecordParams {
    #[schemars(description = "Stored guest record as JSON, either {rooms: [...]} or the legacy {adults, children, roomCount, childAges}")]
    pub record: String,
}

#[derive(Debug, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Vec<DayState>>,
}

#[derive(Debug, Serialize)]
pub struct CalendarView {
    pub months: Vec<MonthView>,
    pub can_go_prev: bool,
    pub can_go_next: bool,
}

#[derive(Debug, Serialize)]
pub struct RoomsView {
    pub rooms: Vec<RoomGuestSpec>,
    pub aggregate: rust_booking::GuestAggregate,
    pub payload: Vec<rust_booking::RoomPayload>,
}

impl From<Vec<RoomGuestSpec>> for RoomsView {
    fn from(rooms: Vec<RoomGuestSpec>) -> Self {
        Self {
            aggregate: aggregate(&rooms),
            payload: search_payload(&rooms),
            rooms,
        }
    }
}

#[tool(tool_box)]
impl BookingServer {
    /// Render the calendar months shown by the date picker
    #[tool(description = "Render the date picker: 6-week Sunday-first grids for the displayed months with per-day flags (in_month, is_today, disabled, is_start, is_end, in_range).")]
    async fn calendar_month(
        &self,
        #[tool(aggr)] params: CalendarMonthParams,
    ) -> String {
        info!(
            year = params.year,
            month = params.month,
            domain = params.state.domain.as_deref().unwrap_or("flight"),
            "Calendar request received"
        );

        let (range, trip_type, domain, today) = match parse_picker_state(&params.state) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Invalid picker state: {}", e);
                return error_json(format!("Invalid picker state: {}", e));
            }
        };

        let anchor = match YearMonth::new(
            params.year.unwrap_or(today.year()),
            params.month.unwrap_or(today.month() as i32) - 1,
        ) {
            Ok(anchor) => anchor,
            Err(e) => return error_json(format!("Invalid month: {}", e)),
        };

        let navigator = match MonthNavigator::starting_at(anchor, today, &self.config.calendar) {
            Ok(navigator) => navigator,
            Err(e) => {
                error!("Error building navigator: {}", e);
                return error_json(format!("Error building calendar: {}", e));
            }
        };

        let months = navigator
            .visible_grids()
            .iter()
            .map(|grid| MonthView {
                year: grid.month().year(),
                month: grid.month().month(),
                weeks: grid
                    .weeks()
                    .map(|week| {
                        week.iter()
                            .map(|date| day_state(*date, grid.month(), &range, trip_type, domain, today))
                            .collect()
                    })
                    .collect(),
            })
            .collect();

        let view = CalendarView {
            months,
            can_go_prev: navigator.can_go_prev(),
            can_go_next: navigator.can_go_next(),
        };
        to_json(&view)
    }

    /// Move the displayed month
    #[tool(description = "Move the date picker one month back or forward. Never goes before the current month or more than the configured number of years ahead; out-of-bounds moves return the same month.")]
    async fn navigate_month(
        &self,
        #[tool(aggr)] params: NavigateMonthParams,
    ) -> String {
        debug!(year = params.year, month = params.month, direction = params.direction, "Navigate request received");

        let today = match parse_today(params.today.as_deref()) {
            Ok(today) => today,
            Err(e) => return error_json(format!("Invalid today date: {}", e)),
        };

        let navigator = match YearMonth::new(params.year, params.month - 1)
            .and_then(|anchor| MonthNavigator::starting_at(anchor, today, &self.config.calendar))
        {
            Ok(navigator) => navigator,
            Err(e) => return error_json(format!("Invalid month: {}", e)),
        };

        let moved = match params.direction.to_lowercase().as_str() {
            "prev" | "previous" | "back" => navigator.prev_month(),
            "next" | "forward" => navigator.next_month(),
            other => {
                warn!(direction = other, "Invalid navigation direction");
                return error_json(format!("Invalid direction: {} (expected prev or next)", other));
            }
        };

        serde_json::json!({
            "year": moved.anchor().year(),
            "month": moved.anchor().month(),
            "moved": moved != navigator,
            "can_go_prev": moved.can_go_prev(),
            "can_go_next": moved.can_go_next(),
        })
        .to_string()
    }

    /// Apply a date click to the current range
    #[tool(description = "Apply a click on a date to the current selection. Returns the new start/end and whether the selection is complete. Past dates are ignored; in round-trip mode a date before the start swaps the pair.")]
    async fn select_date(
        &self,
        #[tool(aggr)] params: SelectDateParams,
    ) -> String {
        info!(
            date = params.date,
            start = params.state.start.as_deref(),
            end = params.state.end.as_deref(),
            trip_type = params.state.trip_type.as_deref().unwrap_or("round-trip"),
            "Select date request received"
        );

        let (range, trip_type, domain, today) = match parse_picker_state(&params.state) {
            Ok(parsed) => parsed,
            Err(e) => return error_json(format!("Invalid picker state: {}", e)),
        };

        let clicked = match params.date.parse::<CalendarDate>() {
            Ok(date) => date,
            Err(e) => return error_json(format!("Invalid date: {}", e)),
        };

        let selection = select_date(range, clicked, trip_type, domain, today);
        serde_json::json!({
            "start": selection.range.start(),
            "end": selection.range.end(),
            "complete": selection.complete,
            "nights": selection.range.nights(),
        })
        .to_string()
    }

    /// Spread flat guest totals over rooms
    #[tool(description = "Distribute total adults and children over a number of rooms. Each room gets an equal share and the first room takes any remainder; child ages are assigned in order and missing ones default to 1.")]
    async fn distribute_guests(
        &self,
        #[tool(aggr)] params: DistributeGuestsParams,
    ) -> String {
        info!(
            adults = params.adults,
            children = params.children.unwrap_or(0),
            room_count = params.room_count,
            "Distribute guests request received"
        );

        if let Err(e) = self.config.rooms.check_room_count(params.room_count) {
            warn!(room_count = params.room_count, "Rejecting room count");
            return error_json(e.to_string());
        }

        let rooms = distribute_flat(
            params.adults,
            params.children.unwrap_or(0),
            params.room_count,
            params.child_ages.as_deref().unwrap_or_default(),
        );
        to_json(&RoomsView::from(rooms))
    }

    /// Edit the room list
    #[tool(description = "Apply one edit to the room list: add_room (up to the room cap), remove_room (at least one room stays), update_guests (field adults|children, step increment|decrement) or set_child_age. Returns the rooms, totals and the search payload.")]
    async fn edit_rooms(
        &self,
        #[tool(aggr)] params: EditRoomsParams,
    ) -> String {
        debug!(action = params.action, room_index = params.room_index, "Edit rooms request received");

        let limits = &self.config.rooms;
        let rooms: Vec<RoomGuestSpec> = match params.rooms {
            Some(rooms) if !rooms.is_empty() => rooms
                .into_iter()
                .take(limits.max_rooms)
                .map(|room| RoomGuestSpec::from(room).clamped(limits))
                .collect(),
            _ => vec![RoomGuestSpec::default()],
        };

        let edited = match params.action.to_lowercase().as_str() {
            "add_room" => add_room(&rooms, limits),
            "remove_room" => match params.room_index {
                Some(index) => remove_room(&rooms, index),
                None => return error_json("remove_room requires room_index".to_string()),
            },
            "update_guests" => {
                let parsed = (
                    params.room_index,
                    params.field.as_deref().map(str::parse::<GuestField>),
                    params.step.as_deref().map(str::parse::<GuestStep>),
                );
                match parsed {
                    (Some(index), Some(Ok(field)), Some(Ok(step))) => {
                        update_room_guests(&rooms, index, field, step, limits)
                    }
                    (_, Some(Err(e)), _) | (_, _, Some(Err(e))) => return error_json(e.to_string()),
                    _ => {
                        return error_json("update_guests requires room_index, field and step".to_string())
                    }
                }
            }
            "set_child_age" => match (params.room_index, params.child_index, params.age) {
                (Some(room), Some(child), Some(age)) => set_child_age(&rooms, room, child, age, limits),
                _ => return error_json("set_child_age requires room_index, child_index and age".to_string()),
            },
            other => {
                warn!(action = other, "Invalid room action");
                return error_json(format!("Invalid action: {}", other));
            }
        };

        to_json(&RoomsView::from(edited))
    }

    /// Read a stored guest record
    #[tool(description = "Load a stored guest selection, upgrading legacy flat records (adults, children, roomCount, childAges) into per-room occupancy.")]
    async fn load_guest_record(
        &self,
        #[tool(aggr)] params: LoadGuestRecordParams,
    ) -> String {
        match PersistedGuests::from_json(&params.record) {
            Ok(stored) => {
                if stored.is_legacy() {
                    info!("Upgrading legacy guest record");
                }
                to_json(&RoomsView::from(stored.into_rooms(&self.config.rooms)))
            }
            Err(e) => {
                error!("Failed to parse guest record: {}", e);
                error_json(format!("Failed to parse guest record: {}", e))
            }
        }
    }
}

// Helper functions for parameter conversion
fn parse_today(today: Option<&str>) -> Result<CalendarDate, BookingError> {
    today.map(str::parse::<CalendarDate>).transpose().map(|d| d.unwrap_or_else(CalendarDate::today))
}

fn parse_picker_state(
    state: &PickerState,
) -> Result<(DateRange, TripMode, SearchDomain, CalendarDate), BookingError> {
    let start = state.start.as_deref().map(str::parse::<CalendarDate>).transpose()?;
    let end = state.end.as_deref().map(str::parse::<CalendarDate>).transpose()?;
    let range = DateRange::new(start, end)?;
    let trip_type = state.trip_type.as_deref().unwrap_or("round-trip").parse::<TripMode>()?;
    let domain = state.domain.as_deref().unwrap_or("flight").parse::<SearchDomain>()?;
    let today = parse_today(state.today.as_deref())?;
    Ok((range, trip_type, domain, today))
}

fn error_json(message: String) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| error_json(format!("Failed to serialize results: {}", e)))
}

#[tool(tool_box)]
impl ServerHandler for BookingServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("A booking form server for flight and hotel searches. Renders date picker months, resolves date clicks into departure/return or check-in/check-out ranges, and edits multi-room guest occupancy. All calls are stateless: pass the current selection with each request.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = BookingServer::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = BookingServer::load_config()?;
    info!(?config, "Starting MCP Booking Server");

    let server = BookingServer::new(config);
    let transport = stdio();

    // SDK handles initialization, tool discovery, and message routing
    let service = server.serve(transport).await?;

    info!("MCP service started, waiting for requests");

    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}
