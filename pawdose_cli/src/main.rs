use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use pawdose_core::adherence::{self, PetFilter};
use pawdose_core::notify::{self, plan_reminders, REMINDERS_FILE};
use pawdose_core::store::JOURNAL_FILE;
use pawdose_core::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pawdose")]
#[command(about = "Pet medication reminders and adherence tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage pets
    Pet {
        #[command(subcommand)]
        action: PetAction,
    },

    /// Manage medications
    Med {
        #[command(subcommand)]
        action: MedAction,
    },

    /// Show doses due on a day (default)
    Today {
        /// Day to show (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Only show this pet
        #[arg(long)]
        pet: Option<String>,
    },

    /// Record a dose as taken (or missed)
    Mark {
        /// Medication name or id
        medication: String,

        /// Reminder time of the dose (HH:MM)
        #[arg(value_parser = parse_clock)]
        time: NaiveTime,

        /// Day of the dose (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Pet owning the medication, when the name is shared
        #[arg(long)]
        pet: Option<String>,

        /// Record the dose as missed instead of taken
        #[arg(long)]
        missed: bool,
    },

    /// Adherence statistics
    Stats {
        /// Last day of the trend window (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Trend window length in days
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TREND_DAYS)))]
        days: Option<u32>,
    },

    /// Show the device reminders currently scheduled
    Reminders,

    /// Export the dose history to CSV
    Export {
        /// Output CSV path
        path: PathBuf,
    },

    /// Write a full backup as JSON
    Backup {
        /// Output JSON path
        path: PathBuf,
    },

    /// Replace all data with the contents of a backup
    Restore {
        /// Backup JSON path
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum PetAction {
    /// Add a pet
    Add { name: String },
    /// Remove a pet with its medications and history
    Remove { name: String },
    /// List pets
    List,
}

#[derive(Subcommand)]
enum MedAction {
    /// Add a medication to a pet
    Add {
        /// Pet name
        #[arg(long)]
        pet: String,

        /// Medication name
        name: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// daily, weekly, or a number of days between doses
        #[arg(long, default_value = "daily")]
        every: Frequency,

        /// Reminder time (HH:MM), repeatable
        #[arg(long = "time", required = true, value_parser = parse_clock)]
        times: Vec<NaiveTime>,

        /// Free-form dosage, e.g. "1 tablet"
        #[arg(long)]
        dosage: Option<String>,
    },
    /// Change a medication; reminders are rescheduled when its timing changes
    Edit {
        /// Medication name or id
        medication: String,

        /// Pet owning the medication, when the name is shared
        #[arg(long)]
        pet: Option<String>,

        /// New medication name
        #[arg(long)]
        name: Option<String>,

        /// New first day (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// New last day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// New frequency: daily, weekly, or a number of days between doses
        #[arg(long)]
        every: Option<Frequency>,

        /// Replacement reminder times (HH:MM), repeatable
        #[arg(long = "time", value_parser = parse_clock)]
        times: Vec<NaiveTime>,

        /// New free-form dosage
        #[arg(long)]
        dosage: Option<String>,
    },
    /// Remove a medication and its history
    Remove {
        /// Medication name or id
        medication: String,

        #[arg(long)]
        pet: Option<String>,
    },
    /// List medications
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    pawdose_core::logging::init(cli.verbose);

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let now = Local::now().naive_local();
    tracing::debug!(%now, "Using data directory {:?}", data_dir);

    match cli.command {
        Some(Commands::Pet { action }) => cmd_pet(&data_dir, action),
        Some(Commands::Med { action }) => cmd_med(&data_dir, action, &config),
        Some(Commands::Today { date, pet }) => cmd_today(&data_dir, date, pet, now),
        Some(Commands::Mark {
            medication,
            time,
            date,
            pet,
            missed,
        }) => cmd_mark(&data_dir, &medication, time, date, pet, missed, now),
        Some(Commands::Stats { date, days }) => cmd_stats(
            &data_dir,
            date.unwrap_or(now.date()),
            days.unwrap_or(config.stats.trend_days),
        ),
        Some(Commands::Reminders) => cmd_reminders(&data_dir, &config),
        Some(Commands::Export { path }) => cmd_export(&data_dir, &path),
        Some(Commands::Backup { path }) => cmd_backup(&data_dir, &path),
        Some(Commands::Restore { path }) => cmd_restore(&data_dir, &path, &config),
        None => {
            // Default to "today" command
            cmd_today(&data_dir, None, None, now)
        }
    }
}

fn parse_clock(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

fn pet_id_by_name(household: &Household, name: Option<&str>) -> Result<Option<Uuid>> {
    name.map(|n| {
        household
            .find_pet_by_name(n)
            .map(|p| p.id)
            .ok_or_else(|| Error::NotFound(format!("pet {n}")))
    })
    .transpose()
}

fn pet_name(household: &Household, pet_id: Uuid) -> &str {
    household.pet(pet_id).map_or("?", |p| p.name.as_str())
}

/// Reject date ranges and intervals no dose could ever fall on
fn check_schedule(start: NaiveDate, end: NaiveDate, every: Frequency) -> Result<()> {
    if start > end {
        return Err(Error::Other(format!(
            "Start date {start} is after end date {end}"
        )));
    }
    if let Frequency::CustomInterval { every_days: 0 } = every {
        return Err(Error::Other("Interval must be at least 1 day".into()));
    }
    Ok(())
}

/// Load the scheduled reminders, apply `f`, and save them back.
///
/// Callers hold the data directory lock.
fn with_reminders<T>(data_dir: &Path, f: impl FnOnce(&mut RecordingSink) -> T) -> Result<T> {
    let path = data_dir.join(REMINDERS_FILE);
    let mut sink = RecordingSink::load(&path)?;
    let out = f(&mut sink);
    sink.save(&path)?;
    Ok(out)
}

fn cmd_pet(data_dir: &Path, action: PetAction) -> Result<()> {
    match action {
        PetAction::Add { name } => {
            Household::update(data_dir, |h| h.add_pet(&name))?;
            println!("✓ Added {}", name.trim());
        }
        PetAction::Remove { name } => {
            let removed = Household::update(data_dir, |h| {
                let pet_id = pet_id_by_name(h, Some(name.as_str()))?
                    .ok_or_else(|| Error::NotFound(format!("pet {name}")))?;
                let removed = h.remove_pet(pet_id)?;
                with_reminders(data_dir, |sink| {
                    for id in &removed {
                        sink.cancel(*id);
                    }
                })?;
                Ok(removed)
            })?;
            println!(
                "✓ Removed {} and {} medication(s)",
                name,
                removed.len()
            );
        }
        PetAction::List => {
            let _lock = DataDirLock::shared(data_dir)?;
            let household = Household::open(data_dir)?;
            if household.pets.is_empty() {
                println!("No pets yet. Add one with `pawdose pet add <name>`.");
            }
            for pet in &household.pets {
                println!(
                    "{}  ({} medication(s))",
                    pet.name,
                    household.medications_for(pet.id).count()
                );
            }
        }
    }
    Ok(())
}

fn cmd_med(data_dir: &Path, action: MedAction, config: &Config) -> Result<()> {
    match action {
        MedAction::Add {
            pet,
            name,
            start,
            end,
            every,
            times,
            dosage,
        } => {
            check_schedule(start, end, every)?;

            let medication = Household::update(data_dir, |h| {
                let pet_id = h
                    .find_pet_by_name(&pet)
                    .map(|p| p.id)
                    .ok_or_else(|| Error::NotFound(format!("pet {pet}")))?;
                let mut medication = Medication::new(pet_id, name.trim(), start, end, every, times);
                medication.dosage = dosage;
                h.add_medication(medication.clone())?;
                with_reminders(data_dir, |sink| {
                    notify::resync(sink, &medication, &config.notifications)
                })?;
                Ok(medication)
            })?;

            println!("✓ Added {} for {} ({})", medication.name, pet, medication.frequency);
            for reminder in plan_reminders(&medication, &config.notifications) {
                println!("  ⏰ {}", reminder.time.format("%H:%M"));
            }
        }
        MedAction::Edit {
            medication,
            pet,
            name,
            start,
            end,
            every,
            times,
            dosage,
        } => {
            let (edited, rescheduled) = Household::update(data_dir, |h| {
                let pet_id = pet_id_by_name(h, pet.as_deref())?;
                let mut edited = h.find_medication(&medication, pet_id)?.clone();
                if let Some(name) = name {
                    edited.name = name.trim().to_string();
                }
                edited.start_date = start.unwrap_or(edited.start_date);
                edited.end_date = end.unwrap_or(edited.end_date);
                edited.frequency = every.unwrap_or(edited.frequency);
                if !times.is_empty() {
                    edited.reminder_times = times;
                }
                if dosage.is_some() {
                    edited.dosage = dosage;
                }
                check_schedule(edited.start_date, edited.end_date, edited.frequency)?;

                let rescheduled = if h.update_medication(edited.clone())? {
                    Some(with_reminders(data_dir, |sink| {
                        notify::resync(sink, &edited, &config.notifications)
                    })?)
                } else {
                    None
                };
                Ok((edited, rescheduled))
            })?;

            println!("✓ Updated {} ({})", edited.name, edited.frequency);
            match rescheduled {
                Some(count) => {
                    tracing::info!(medication = %edited.id, count, "Rescheduled reminders");
                    println!("  Rescheduled {} reminder(s)", count);
                    for reminder in plan_reminders(&edited, &config.notifications) {
                        println!("  ⏰ {}", reminder.time.format("%H:%M"));
                    }
                }
                None => println!("  Reminders unchanged"),
            }
        }
        MedAction::Remove { medication, pet } => {
            let removed = Household::update(data_dir, |h| {
                let pet_id = pet_id_by_name(h, pet.as_deref())?;
                let id = h.find_medication(&medication, pet_id)?.id;
                let removed = h.remove_medication(id)?;
                with_reminders(data_dir, |sink| sink.cancel(id))?;
                Ok(removed)
            })?;
            println!("✓ Removed {}", removed.name);
        }
        MedAction::List => {
            let _lock = DataDirLock::shared(data_dir)?;
            let household = Household::open(data_dir)?;
            for med in &household.medications {
                let times: Vec<_> = med
                    .reminder_times
                    .iter()
                    .map(|t| t.format("%H:%M").to_string())
                    .collect();
                println!(
                    "{}  {}  {}  {} → {}  [{}]  {}",
                    pet_name(&household, med.pet_id),
                    med.name,
                    med.frequency,
                    med.start_date,
                    med.end_date,
                    times.join(", "),
                    med.id
                );
            }
        }
    }
    Ok(())
}

fn cmd_today(
    data_dir: &Path,
    date: Option<NaiveDate>,
    pet: Option<String>,
    now: NaiveDateTime,
) -> Result<()> {
    let _lock = DataDirLock::shared(data_dir)?;
    let household = Household::open(data_dir)?;
    let filter: PetFilter = pet_id_by_name(&household, pet.as_deref())?.into();
    let date = date.unwrap_or(now.date());

    let meds = &household.medications;
    let logs = &household.logs;
    let remaining = adherence::remaining_on(date, meds, logs, filter);
    let completed = adherence::completed_on(date, meds, logs, filter);
    let overdue: HashSet<DoseKey> = adherence::overdue_at(now, meds, logs, filter)
        .iter()
        .map(|m| m.dose.key())
        .collect();
    let counts = adherence::summarize_day(date, meds, logs, filter);

    println!("\n  Doses for {}", date.format("%A %Y-%m-%d"));
    println!("─────────────────────────────────────────");

    if counts.total == 0 {
        println!("  Nothing due.");
        return Ok(());
    }

    if !remaining.is_empty() {
        println!("  Remaining");
        for m in &remaining {
            let suffix = if overdue.contains(&m.dose.key()) { "  (overdue)" } else { "" };
            print_dose(&household, m, suffix);
        }
    }
    if !completed.is_empty() {
        println!("  Completed");
        for m in &completed {
            let label = match m.status() {
                DoseStatus::Taken => "  ✓ taken",
                DoseStatus::Missed => "  ✗ missed",
                DoseStatus::Pending => "",
            };
            print_dose(&household, m, label);
        }
    }

    println!();
    println!(
        "  {} taken · {} missed · {} pending · adherence {:.0}%",
        counts.taken,
        counts.missed,
        counts.pending,
        counts.percent()
    );
    Ok(())
}

fn print_dose(household: &Household, m: &MatchedDose<'_>, suffix: &str) {
    let med = m.dose.medication;
    let dosage = med
        .dosage
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();
    println!(
        "    {}  {:<10} {}{}{}",
        m.dose.scheduled_at.format("%H:%M"),
        pet_name(household, med.pet_id),
        med.name,
        dosage,
        suffix
    );
}

fn cmd_mark(
    data_dir: &Path,
    medication: &str,
    time: NaiveTime,
    date: Option<NaiveDate>,
    pet: Option<String>,
    missed: bool,
    now: NaiveDateTime,
) -> Result<()> {
    // Held from the duplicate check through the append
    let _lock = DataDirLock::exclusive(data_dir)?;
    let household = Household::open(data_dir)?;
    let pet_id = pet_id_by_name(&household, pet.as_deref())?;
    let medication = household.find_medication(medication, pet_id)?;
    let date = date.unwrap_or(now.date());

    let doses = doses_on(date, std::slice::from_ref(medication));
    let dose = doses
        .iter()
        .find(|d| d.scheduled_at == resolve_occurrence(date, time))
        .ok_or_else(|| {
            Error::NotFound(format!(
                "no dose of {} due at {} on {}",
                medication.name,
                time.format("%H:%M"),
                date
            ))
        })?;

    if let Some(existing) = log_for(dose, &household.logs) {
        return Err(Error::Store(format!(
            "{} at {} on {} is already logged as {}",
            medication.name,
            time.format("%H:%M"),
            date,
            existing.status
        )));
    }

    let status = if missed { LogStatus::Missed } else { LogStatus::Taken };
    let log = record_action(dose, status, now);
    JsonlJournal::new(data_dir.join(JOURNAL_FILE)).append(&log)?;
    tracing::info!(
        medication = %medication.id,
        scheduled = %log.scheduled_time,
        %status,
        "Recorded dose"
    );

    println!(
        "✓ {} for {} at {} marked {}",
        medication.name,
        pet_name(&household, medication.pet_id),
        log.scheduled_time.format("%Y-%m-%d %H:%M"),
        status
    );
    Ok(())
}

fn cmd_stats(data_dir: &Path, end_date: NaiveDate, days: u32) -> Result<()> {
    let _lock = DataDirLock::shared(data_dir)?;
    let household = Household::open(data_dir)?;
    let meds = &household.medications;
    let logs = &household.logs;

    let today = adherence::summarize_day(end_date, meds, logs, PetFilter::All);
    println!("\n  Today ({})", end_date);
    println!(
        "    {} taken · {} missed · {} pending of {} · adherence {:.0}%",
        today.taken,
        today.missed,
        today.pending,
        today.total,
        today.percent()
    );

    println!("\n  Last {} day(s)", days);
    for day in adherence::daily_trend(end_date, days, meds, logs, PetFilter::All) {
        println!(
            "    {}  {:>3.0}%  ({} taken, {} missed)",
            day.date.format("%a %m-%d"),
            day.percent,
            day.taken,
            day.missed
        );
    }

    println!("\n  By pet (needs attention first)");
    for pet in adherence::per_pet_breakdown(&household.pets, meds, logs) {
        println!(
            "    {:<12} {:>3.0}%  ({} taken, {} missed)",
            pet.pet_name, pet.percent, pet.taken, pet.missed
        );
    }

    let overall = adherence::all_time(meds, logs, PetFilter::All);
    println!(
        "\n  All time: adherence {:.0}% over {} logged dose(s)",
        overall.percent(),
        overall.total
    );
    Ok(())
}

fn cmd_reminders(data_dir: &Path, config: &Config) -> Result<()> {
    let _lock = DataDirLock::shared(data_dir)?;
    let household = Household::open(data_dir)?;
    let sink = RecordingSink::load(&data_dir.join(REMINDERS_FILE))?;
    let settings = &config.notifications;
    println!(
        "Sound {} · snooze {} min",
        if settings.sound { "on" } else { "off" },
        settings.snooze_minutes
    );
    for med in &household.medications {
        let scheduled = sink.for_medication(med.id);
        if scheduled.is_empty() {
            println!("{} / {}: no reminders", pet_name(&household, med.pet_id), med.name);
            continue;
        }
        for reminder in scheduled {
            println!(
                "{} / {}: {} from {} to {} ({})",
                pet_name(&household, med.pet_id),
                med.name,
                reminder.time.format("%H:%M"),
                reminder.first_date,
                reminder.last_date,
                med.frequency
            );
        }
    }
    Ok(())
}

fn cmd_export(data_dir: &Path, path: &Path) -> Result<()> {
    let _lock = DataDirLock::shared(data_dir)?;
    let household = Household::open(data_dir)?;
    let count = pawdose_core::export::logs_to_csv(&household, path)?;
    println!("✓ Exported {} log(s)", count);
    println!("  CSV: {}", path.display());
    Ok(())
}

fn cmd_backup(data_dir: &Path, path: &Path) -> Result<()> {
    let _lock = DataDirLock::shared(data_dir)?;
    let household = Household::open(data_dir)?;
    pawdose_core::backup::write(&household, path)?;
    println!(
        "✓ Backed up {} pet(s), {} medication(s), {} log(s)",
        household.pets.len(),
        household.medications.len(),
        household.logs.len()
    );
    Ok(())
}

fn cmd_restore(data_dir: &Path, path: &Path, config: &Config) -> Result<()> {
    let household = pawdose_core::backup::read(path)?;

    let _lock = DataDirLock::exclusive(data_dir)?;
    household.persist(data_dir)?;
    let scheduled = with_reminders(data_dir, |sink| {
        let stale: HashSet<Uuid> = sink.scheduled.iter().map(|r| r.medication_id).collect();
        for id in stale {
            sink.cancel(id);
        }
        household
            .medications
            .iter()
            .map(|med| notify::resync(&mut *sink, med, &config.notifications))
            .sum::<usize>()
    })?;

    println!(
        "✓ Restored {} pet(s), {} medication(s), {} log(s)",
        household.pets.len(),
        household.medications.len(),
        household.logs.len()
    );
    println!("  {} reminder(s) scheduled", scheduled);
    Ok(())
}
