//! `daygrid` CLI -- render calendar grids and work with recurrence rules.
//!
//! ## Usage
//!
//! ```sh
//! # Month grid for February 2024 with events from a file
//! daygrid grid --href month/2024-2-1 --events events.json
//!
//! # Two-week view, moved forward one period, as JSON
//! daygrid grid --period 14 --start 2024-2-14 --step 1 --json
//!
//! # Recurrence editor state -> stored rule fields
//! echo '{"freq_type":"WEEKLY","interval":1,"weekdays":17,
//!        "monthly":{"kind":"day_of_month","day":1},
//!        "termination":{"mode":"forever"}}' | daygrid encode --date 2024-2-5
//!
//! # Stored rule fields -> recurrence editor state
//! echo '{"freq_type":"MONTHLY","freq_target":2,"freq_count":-2}' | daygrid decode --anchor 2024-3-19
//!
//! # Occurrence dates of a stored rule
//! echo '{"freq_type":"DAILY","until_count":3}' | daygrid expand --date 2024-2-1 --from 2024-2-1 --until 2024-2-29
//! ```
//!
//! Settings come from `daygrid.toml` (or `--config`), then `DAYGRID_*`
//! environment variables, then command-line flags.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use daygrid::recurrence::{decode, encode};
use daygrid::{
    date, expander, CalendarController, CalendarEvent, CalendarSettings, CalendarView, DateRange,
    DayPatch, MemoryBackend, RecurrenceRule, RecurrenceSelection, RuleFields,
};
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "daygrid",
    version,
    about = "Calendar grid and recurrence rule CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ./daygrid.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the calendar grid for a period
    Grid {
        /// Bookmark such as "month/2024-2-1" or "14/2024-3-3"
        #[arg(long)]
        href: Option<String>,
        /// "month" or a number of days
        #[arg(long)]
        period: Option<String>,
        /// Reference date of the view
        #[arg(long)]
        start: Option<String>,
        /// Explicit last day of the view
        #[arg(long)]
        last: Option<String>,
        /// Move this many periods forward (negative: backward)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        step: i32,
        /// JSON file with "events" and optional per-day "days" data
        #[arg(short, long)]
        events: Option<String>,
        /// Print the grid as JSON
        #[arg(long)]
        json: bool,
    },
    /// Encode recurrence editor state (JSON) into stored rule fields
    Encode {
        /// Date of the event the rule belongs to
        #[arg(long)]
        date: String,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Decode stored rule fields (JSON) into recurrence editor state
    Decode {
        /// Date of the event the rule belongs to
        #[arg(long)]
        anchor: String,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// List the occurrence dates of stored rule fields (JSON) in a window
    Expand {
        /// First occurrence of the series
        #[arg(long)]
        date: String,
        /// First day of the window
        #[arg(long)]
        from: String,
        /// Last day of the window
        #[arg(long)]
        until: String,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

/// Contents of an `--events` file.
#[derive(Debug, Deserialize)]
struct EventsFile {
    #[serde(default)]
    events: Vec<CalendarEvent>,
    /// Per-day data keyed by date.
    #[serde(default)]
    days: BTreeMap<String, DayPatch>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_tracing(&settings.log_level);
    debug!(settings = ?settings, "settings loaded");

    match cli.command {
        Commands::Grid {
            href,
            period,
            start,
            last,
            step,
            events,
            json,
        } => {
            let mut settings = settings;
            if let Some(period) = period {
                settings.period = period;
            }
            if let Some(start) = start {
                settings.start = Some(parse_date(&start)?);
                settings.href = None;
            }
            if let Some(last) = last {
                settings.last = Some(parse_date(&last)?);
            }
            if href.is_some() {
                settings.href = href;
            }

            let backend = load_backend(events.as_deref())?;
            let mut controller = CalendarController::new(&settings, backend)
                .context("Failed to set up the calendar view")?;
            for _ in 0..step.unsigned_abs() {
                if step > 0 {
                    controller.next();
                } else {
                    controller.previous();
                }
            }

            let view = render(&mut controller)?;
            if json {
                let value = view_to_json(&view, &controller.href());
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", view_to_text(&view, &controller.href()));
            }
        }
        Commands::Encode {
            date: reference,
            input,
        } => {
            let reference = parse_date(&reference)?;
            let raw = read_input(input.as_deref())?;
            let selection: RecurrenceSelection =
                serde_json::from_str(&raw).context("Failed to parse recurrence selection")?;
            let rule = encode(&selection, reference).context("Failed to encode recurrence")?;
            println!("{}", serde_json::to_string_pretty(&rule.to_fields())?);
        }
        Commands::Decode { anchor, input } => {
            let anchor = parse_date(&anchor)?;
            let rule = read_rule(input.as_deref())?;
            let selection = decode(&rule, anchor);
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        Commands::Expand {
            date: first,
            from,
            until,
            input,
        } => {
            let dtstart = parse_date(&first)?;
            let window = DateRange {
                start: parse_date(&from)?,
                last: parse_date(&until)?,
            };
            let rule = read_rule(input.as_deref())?;
            let dates = expander::expand(&rule, dtstart, window)
                .context("Failed to expand recurrence")?;
            debug!(count = dates.len(), "expanded recurrence");
            for day in dates {
                println!("{}", date::format(day));
            }
        }
    }

    Ok(())
}

/// Layer the settings file and `DAYGRID_*` environment variables.
///
/// An explicit `--config` file must exist; the default `daygrid.toml` is
/// optional.
fn load_settings(path: Option<&str>) -> Result<CalendarSettings> {
    let file = match path {
        Some(path) => config::File::with_name(path).required(true),
        None => config::File::with_name("daygrid.toml").required(false),
    };

    config::Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix("DAYGRID").ignore_empty(true))
        .build()
        .context("Failed to load settings")?
        .try_deserialize::<CalendarSettings>()
        .context("Invalid settings")
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so that stdout
/// stays machine-readable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    date::parse(raw).with_context(|| format!("Invalid date: '{}'", raw))
}

fn load_backend(path: Option<&str>) -> Result<MemoryBackend> {
    let mut backend = MemoryBackend::new();
    let Some(path) = path else {
        return Ok(backend);
    };

    let raw = read_input(Some(path))?;
    let file: EventsFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse events file: {}", path))?;

    for event in file.events {
        backend.insert(event);
    }
    for (day, patch) in file.days {
        backend.set_day(parse_date(&day)?, patch);
    }
    Ok(backend)
}

fn render(controller: &mut CalendarController<MemoryBackend>) -> Result<CalendarView> {
    let slot: Rc<RefCell<Option<CalendarView>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&slot);
    controller
        .refresh(move |view| *sink.borrow_mut() = Some(view))
        .context("Failed to load events")?;

    let view = slot.borrow_mut().take();
    view.context("Calendar view was not produced")
}

fn view_to_text(view: &CalendarView, href: &str) -> String {
    let mut out = format!("{}  ({})\n", view.heading, href);
    out.push_str(" Sun  Mon  Tue  Wed  Thu  Fri  Sat\n");

    for week in view.weeks() {
        let cells: Vec<String> = week
            .iter()
            .map(|day| {
                let marker = if day.events.is_empty() { ' ' } else { '*' };
                let label = day.date.day().to_string();
                if day.is_filler {
                    format!("({:>2})", label)
                } else {
                    format!(" {:>2}{}", label, marker)
                }
            })
            .collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }

    for day in &view.days {
        if day.is_filler {
            continue;
        }
        if let Some(footnote) = &day.footnote {
            out.push_str(&format!("{:<11} # {}\n", date::format(day.date), footnote));
        }
        for event in &day.events {
            let time = event.time.as_deref().map(|t| format!("{} ", t)).unwrap_or_default();
            let repeat = if event.rule.is_recurring() {
                format!(" [{}]", event.rule.freq_type.label())
            } else {
                String::new()
            };
            out.push_str(&format!(
                "{:<11} {}{}{}\n",
                date::format(day.date),
                time,
                event.name,
                repeat
            ));
        }
    }
    out
}

fn view_to_json(view: &CalendarView, href: &str) -> serde_json::Value {
    let days: Vec<serde_json::Value> = view
        .days
        .iter()
        .map(|day| {
            serde_json::json!({
                "date": date::format(day.date),
                "filler": day.is_filler,
                "footnote": day.footnote,
                "events": day.events,
            })
        })
        .collect();

    serde_json::json!({
        "heading": view.heading,
        "href": href,
        "start": date::format(view.range.start),
        "last": date::format(view.range.last),
        "days": days,
    })
}

fn read_rule(path: Option<&str>) -> Result<RecurrenceRule> {
    let raw = read_input(path)?;
    let fields: RuleFields = serde_json::from_str(&raw).context("Failed to parse rule fields")?;
    RecurrenceRule::from_fields(&fields).context("Invalid recurrence rule")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
