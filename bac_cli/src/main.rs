use bac_core::analytics::compute_session_stats;
use bac_core::csv_export::{write_series, write_series_csv};
use bac_core::drink_log::read_drinks;
use bac_core::monitor::system_clock;
use bac_core::*;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "bactrack")]
#[command(about = "Blood alcohol estimator for logged drinks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a drink
    Log {
        /// Volume in millilitres
        #[arg(long)]
        volume_ml: f64,

        /// Alcohol by volume, in percent
        #[arg(long)]
        abv: f64,

        /// Drink was downed in one go
        #[arg(long)]
        chug: bool,

        /// When the drink started (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete a logged drink by id
    Delete { id: String },

    /// Show or update the profile
    Profile {
        #[arg(long)]
        weight_kg: Option<f64>,

        #[arg(long, value_enum)]
        gender: Option<GenderArg>,

        #[arg(long, value_enum)]
        speed: Option<PaceArg>,

        #[arg(long, value_enum)]
        habit: Option<PaceArg>,

        #[arg(long, value_enum)]
        language: Option<LanguageArg>,
    },

    /// Show the current BAC status (default)
    Status {
        /// Evaluate at this time (RFC 3339) instead of now
        #[arg(long)]
        at: Option<String>,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print or export the simulated BAC curve
    Series {
        /// Simulate until this time (RFC 3339); defaults to last drink + margin
        #[arg(long)]
        until: Option<String>,

        /// Write CSV to this file instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Episode and streak statistics over the whole log
    Stats {
        /// Day to count streaks up to (YYYY-MM-DD); defaults to today (UTC)
        #[arg(long)]
        today: Option<String>,
    },

    /// Estimate a peer's BAC from their last known value
    Peer {
        /// Last known BAC in percent
        #[arg(long)]
        bac: f64,

        /// When that value was published (RFC 3339)
        #[arg(long)]
        updated: String,

        #[arg(long, value_enum, default_value = "average")]
        habit: PaceArg,

        /// Evaluate at this time (RFC 3339) instead of now
        #[arg(long)]
        at: Option<String>,
    },

    /// Recompute the status on a timer and print each update
    Watch {
        /// Seconds between recomputes; defaults to the configured interval
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop after this many updates
        #[arg(long)]
        ticks: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GenderArg {
    Male,
    Female,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PaceArg {
    Slow,
    Average,
    Fast,
}

impl From<PaceArg> for Pace {
    fn from(arg: PaceArg) -> Self {
        match arg {
            PaceArg::Slow => Pace::Slow,
            PaceArg::Average => Pace::Average,
            PaceArg::Fast => Pace::Fast,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LanguageArg {
    En,
    De,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::En => Language::En,
            LanguageArg::De => Language::De,
        }
    }
}

fn main() -> Result<()> {
    bac_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    match cli.command {
        Some(Commands::Log {
            volume_ml,
            abv,
            chug,
            at,
        }) => cmd_log(&config, volume_ml, abv, chug, at),
        Some(Commands::Delete { id }) => cmd_delete(&config, &id),
        Some(Commands::Profile {
            weight_kg,
            gender,
            speed,
            habit,
            language,
        }) => cmd_profile(&config, weight_kg, gender, speed, habit, language),
        Some(Commands::Status { at, json }) => cmd_status(&config, at, json),
        Some(Commands::Series { until, csv }) => cmd_series(&config, until, csv),
        Some(Commands::Stats { today }) => cmd_stats(&config, today),
        Some(Commands::Peer {
            bac,
            updated,
            habit,
            at,
        }) => cmd_peer(&config, bac, &updated, habit, at),
        Some(Commands::Watch {
            interval_secs,
            ticks,
        }) => cmd_watch(&config, interval_secs, ticks),
        None => cmd_status(&config, None, false),
    }
}

fn parse_time(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.timestamp_millis())
        .map_err(|e| Error::InvalidArgument(format!("invalid time {:?}: {}", value, e)))
}

fn time_or_now(value: Option<String>) -> Result<i64> {
    match value {
        Some(value) => parse_time(&value),
        None => Ok(Utc::now().timestamp_millis()),
    }
}

fn format_time(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| format!("{} ms", ms))
}

fn cmd_log(config: &Config, volume_ml: f64, abv: f64, chug: bool, at: Option<String>) -> Result<()> {
    let timestamp_ms = time_or_now(at)?;
    let mut drink = DrinkEvent::logged(timestamp_ms, volume_ml, abv);
    drink.is_chug = chug;

    if let Err(reason) = bac_core::normalize::validate_event(&drink) {
        return Err(Error::InvalidArgument(format!("drink not logged: {}", reason)));
    }

    let mut log = JsonlDrinkLog::new(config.drinks_path());
    log.append(&drink)?;
    tracing::debug!("Logged drink {} to {:?}", drink.id, log.path());

    println!("✓ Drink logged ({})", drink.id);
    println!("  {} ml at {}% on {}", volume_ml, abv, format_time(timestamp_ms));
    Ok(())
}

fn cmd_delete(config: &Config, id: &str) -> Result<()> {
    let mut log = JsonlDrinkLog::new(config.drinks_path());
    if log.remove(id)? {
        println!("✓ Drink {} deleted", id);
    } else {
        println!("No drink with id {} in the log.", id);
    }
    Ok(())
}

fn cmd_profile(
    config: &Config,
    weight_kg: Option<f64>,
    gender: Option<GenderArg>,
    speed: Option<PaceArg>,
    habit: Option<PaceArg>,
    language: Option<LanguageArg>,
) -> Result<()> {
    let path = config.profile_path();
    let changed = weight_kg.is_some()
        || gender.is_some()
        || speed.is_some()
        || habit.is_some()
        || language.is_some();

    let profile = if changed {
        if let Some(weight) = weight_kg {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(Error::InvalidArgument(format!(
                    "weight must be positive, got {}",
                    weight
                )));
            }
        }
        let profile = Profile::update(&path, |profile| {
            if let Some(weight) = weight_kg {
                profile.weight_kg = weight;
            }
            if let Some(gender) = gender {
                profile.gender = gender.into();
            }
            if let Some(speed) = speed {
                profile.drinking_speed = speed.into();
            }
            if let Some(habit) = habit {
                profile.habit_level = habit.into();
            }
            if let Some(language) = language {
                profile.language = language.into();
            }
            Ok(())
        })?;
        println!("✓ Profile saved");
        profile
    } else {
        Profile::load(&path)?
    };

    println!("  Weight:         {} kg", profile.weight_kg);
    println!("  Gender:         {:?}", profile.gender);
    println!("  Drinking speed: {:?}", profile.drinking_speed);
    println!("  Habit level:    {:?}", profile.habit_level);
    println!("  Language:       {:?}", profile.language);
    Ok(())
}

fn load_inputs(config: &Config) -> Result<(Vec<DrinkEvent>, Profile)> {
    let drinks = read_drinks(&config.drinks_path())?;
    let profile = Profile::load(&config.profile_path())?;
    Ok((drinks, profile))
}

fn cmd_status(config: &Config, at: Option<String>, json: bool) -> Result<()> {
    let now_ms = time_or_now(at)?;
    let (drinks, profile) = load_inputs(config)?;
    let status = compute_bac_status_with(&config.simulation, &drinks, &profile, now_ms)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        display_status(&status, profile.language, now_ms);
    }
    Ok(())
}

fn display_status(status: &BacStatus, language: Language, now_ms: i64) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  BAC {:.3}%  {}", status.current_bac, status.stage.to_string().to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", status.message(language));
    println!("  As of: {}", format_time(now_ms));
    match status.peak_time_ms {
        Some(peak) => println!("  Peak:  {:.3}% at {}", status.peak_bac, format_time(peak)),
        None => println!("  Peak:  none"),
    }
    match status.sober_time_ms {
        Some(sober) => println!("  Sober: {}", format_time(sober)),
        None => println!("  Sober: not yet known"),
    }
    println!("  Color: {}", status.color_token);
    println!();
}

fn cmd_series(config: &Config, until: Option<String>, csv: Option<PathBuf>) -> Result<()> {
    let (drinks, profile) = load_inputs(config)?;

    let horizon = match until {
        Some(until) => parse_time(&until)?,
        None => match bac_core::engine::default_horizon(&drinks, &config.simulation) {
            Some(horizon) => horizon,
            None => {
                println!("No drinks logged - nothing to simulate.");
                return Ok(());
            }
        },
    };

    let series = compute_bac_series_with(&config.simulation, &drinks, &profile, horizon)?;

    match csv {
        Some(path) => {
            let count = write_series_csv(&series, &path)?;
            println!("✓ Exported {} samples", count);
            println!("  CSV: {}", path.display());
        }
        None => {
            write_series(&series, std::io::stdout().lock())?;
        }
    }
    Ok(())
}

fn cmd_stats(config: &Config, today: Option<String>) -> Result<()> {
    let today = match today {
        Some(day) => NaiveDate::parse_from_str(&day, "%Y-%m-%d")
            .map_err(|e| Error::InvalidArgument(format!("invalid date {:?}: {}", day, e)))?,
        None => Utc::now().date_naive(),
    };

    let (drinks, profile) = load_inputs(config)?;
    let stats = compute_session_stats(&config.simulation, &drinks, &profile)?;
    let streaks = drinking_streaks(&drinks, today);

    println!("  Drinks logged:        {}", drinks.len());
    println!("  Drinking days:        {}", streaks.drinking_days);
    println!("  Longest streak:       {} days", streaks.longest_streak_days);
    println!("  Current streak:       {} days", streaks.current_streak_days);
    println!("  Episodes:             {}", stats.episodes.len());
    match stats.peak_time_ms {
        Some(at) => println!("  Highest BAC:          {:.3}% at {}", stats.peak_bac, format_time(at)),
        None => println!("  Highest BAC:          none"),
    }
    println!(
        "  Longest intoxicated:  {}",
        format_duration(stats.longest_intoxicated_ms)
    );
    println!(
        "  Total intoxicated:    {}",
        format_duration(stats.total_intoxicated_ms)
    );
    Ok(())
}

fn format_duration(ms: i64) -> String {
    let minutes = ms / MINUTE_MS;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn cmd_peer(
    config: &Config,
    bac: f64,
    updated: &str,
    habit: PaceArg,
    at: Option<String>,
) -> Result<()> {
    let last_update_ms = parse_time(updated)?;
    let now_ms = time_or_now(at)?;
    let snapshot = PeerSnapshot::LastKnown {
        bac,
        last_update_ms,
        habit_level: habit.into(),
    };
    let status = resolve_peer_status(&snapshot, now_ms)?;
    let language = Profile::load(&config.profile_path())?.language;
    display_status(&status, language, now_ms);
    Ok(())
}

/// Reads the drink log and profile from disk on every tick
struct FileSource {
    drinks_path: PathBuf,
    profile_path: PathBuf,
}

impl SnapshotSource for FileSource {
    fn snapshot(&self) -> Result<PeerSnapshot> {
        Ok(PeerSnapshot::Full {
            events: read_drinks(&self.drinks_path)?,
            profile: Profile::load(&self.profile_path)?,
        })
    }
}

fn cmd_watch(config: &Config, interval_secs: Option<u64>, ticks: Option<u32>) -> Result<()> {
    let interval_secs = interval_secs.unwrap_or(config.monitor.interval_seconds);
    if interval_secs == 0 {
        return Err(Error::InvalidArgument("interval must be positive".into()));
    }

    let source = Arc::new(FileSource {
        drinks_path: config.drinks_path(),
        profile_path: config.profile_path(),
    });
    let language = Profile::load(&config.profile_path())?.language;

    tracing::info!("Watching status every {}s", interval_secs);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(watch_loop(
        source,
        config.simulation.clone(),
        Duration::from_secs(interval_secs),
        ticks,
        language,
    ));
    Ok(())
}

async fn watch_loop(
    source: Arc<FileSource>,
    params: SimulationParams,
    interval: Duration,
    ticks: Option<u32>,
    language: Language,
) {
    let mut monitor = StatusMonitor::spawn(source, params, interval, system_clock());
    let mut updates = monitor.subscribe();
    let mut seen = 0u32;

    while updates.changed().await.is_ok() {
        let latest = updates.borrow_and_update().clone();
        if let Some(published) = latest {
            let status = &published.status;
            println!(
                "[{}] BAC {:.3}% {} - {}",
                format_time(published.computed_at_ms),
                status.current_bac,
                status.stage,
                status.message(language)
            );
        }

        while let Some(alert) = monitor.try_alert() {
            println!("⚠ Getting drunker: {} → {}", alert.from, alert.to);
        }

        seen += 1;
        if ticks.is_some_and(|limit| seen >= limit) {
            break;
        }
    }

    monitor.shutdown();
}
