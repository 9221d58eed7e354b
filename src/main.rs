//! CLI interface for rust-booking

use clap::{Parser, Subcommand};
use rust_booking::{
    aggregate, day_state, distribute_flat, search_payload, select_date, BookingConfig, CalendarDate,
    DateRange, MonthNavigator, PersistedGuests, SearchDomain, TripMode, YearMonth,
};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "rust-booking")]
#[command(about = "Date-range picker and room/guest tools for booking searches")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the calendar months shown by the picker
    Calendar {
        /// Year to open on (defaults to today's)
        #[arg(short, long)]
        year: Option<i32>,
        /// Month to open on, 1-12 (defaults to today's)
        #[arg(short, long)]
        month: Option<i32>,
        /// Selected start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Selected end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Trip type (one-way, round-trip)
        #[arg(long, default_value = "round-trip")]
        trip_type: String,
        /// Search domain (flight, hotel)
        #[arg(long, default_value = "flight")]
        domain: String,
        /// Override today's date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// Apply one date click to a range and print the result as JSON
    Select {
        /// Date clicked (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Current start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Current end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Trip type (one-way, round-trip)
        #[arg(long, default_value = "one-way")]
        trip_type: String,
        /// Search domain (flight, hotel)
        #[arg(long, default_value = "flight")]
        domain: String,
        /// Override today's date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// Spread flat guest totals over rooms
    Distribute {
        /// Total adults
        #[arg(long, default_value = "1")]
        adults: u32,
        /// Total children
        #[arg(long, default_value = "0")]
        children: u32,
        /// Number of rooms
        #[arg(long, default_value = "1")]
        rooms: u32,
        /// Known child ages (comma-separated)
        #[arg(long)]
        ages: Option<String>,
    },
    /// Convert a stored guest record (legacy or current) into rooms
    Upgrade {
        /// JSON file holding the stored record
        #[arg(short, long)]
        file: PathBuf,
        /// Output file for the upgraded record
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("rust_booking=debug,info")
        } else {
            EnvFilter::new("rust_booking=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn parse_range(start: Option<String>, end: Option<String>) -> Result<DateRange, Box<dyn std::error::Error>> {
    let start = start.map(|s| s.parse::<CalendarDate>()).transpose()?;
    let end = end.map(|s| s.parse::<CalendarDate>()).transpose()?;
    Ok(DateRange::new(start, end)?)
}

fn parse_today(today: Option<String>) -> Result<CalendarDate, Box<dyn std::error::Error>> {
    Ok(match today {
        Some(s) => s.parse()?,
        None => CalendarDate::today(),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => BookingConfig::from_file(path)?,
        None => BookingConfig::default(),
    };
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Calendar {
            year,
            month,
            start,
            end,
            trip_type,
            domain,
            today,
        } => {
            let today = parse_today(today)?;
            let range = parse_range(start, end)?;
            let trip_type = trip_type.parse::<TripMode>()?;
            let domain = domain.parse::<SearchDomain>()?;

            let anchor = YearMonth::new(
                year.unwrap_or(today.year()),
                month.map(|m| m - 1).unwrap_or(today.month() as i32 - 1),
            )?;
            let navigator = MonthNavigator::starting_at(anchor, today, &config.calendar)?;
            if navigator.anchor() != anchor {
                println!("Requested {} is outside the picker window, showing {}", anchor, navigator.anchor());
            }

            for grid in navigator.visible_grids() {
                println!("\n{}", grid.month());
                println!(" Su  Mo  Tu  We  Th  Fr  Sa");
                for week in grid.weeks() {
                    let line: Vec<String> = week
                        .iter()
                        .map(|date| {
                            let state = day_state(*date, grid.month(), &range, trip_type, domain, today);
                            let marker = if state.is_start || state.is_end {
                                '*'
                            } else if state.in_range {
                                '~'
                            } else if state.disabled {
                                '.'
                            } else {
                                ' '
                            };
                            if state.in_month {
                                format!("{:>3}{}", date.day(), marker)
                            } else {
                                "    ".to_string()
                            }
                        })
                        .collect();
                    println!("{}", line.join(""));
                }
            }
        }
        Commands::Select {
            date,
            start,
            end,
            trip_type,
            domain,
            today,
        } => {
            let today = parse_today(today)?;
            let range = parse_range(start, end)?;
            let clicked = date.parse::<CalendarDate>()?;
            let trip_type = trip_type.parse::<TripMode>()?;
            let domain = domain.parse::<SearchDomain>()?;

            let selection = select_date(range, clicked, trip_type, domain, today);
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        Commands::Distribute {
            adults,
            children,
            rooms,
            ages,
        } => {
            config.rooms.check_room_count(rooms)?;
            let ages: Vec<u32> = match ages {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse::<u32>())
                    .collect::<Result<_, _>>()?,
                None => Vec::new(),
            };

            let distributed = distribute_flat(adults, children, rooms, &ages);
            let output = serde_json::json!({
                "rooms": distributed,
                "aggregate": aggregate(&distributed),
                "payload": search_payload(&distributed),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Upgrade { file, output } => {
            let content = fs::read_to_string(&file)?;
            let stored = PersistedGuests::from_json(&content)?;
            if stored.is_legacy() {
                info!(file = %file.display(), "Upgrading legacy guest record");
            }

            let rooms = stored.into_rooms(&config.rooms);
            let json = PersistedGuests::from_rooms(&rooms).to_json()?;

            if let Some(output_file) = output {
                fs::write(&output_file, &json)?;
                println!("Upgraded record saved to {}", output_file.display());
            } else {
                println!("{}", json);
            }

            let totals = aggregate(&rooms);
            println!(
                "\n{} room(s), {} adult(s), {} child(ren)",
                totals.room_count, totals.total_adults, totals.total_children
            );
        }
    }

    Ok(())
}
