//! Command-line front end for the calendar engine.
//!
//! # Responsibility
//! - Map one invocation to one engine operation on a calendar file and/or
//!   the configured database.
//! - Print results as text, or JSON with `--json`.
//!
//! # Invariants
//! - Any engine error exits with a non-zero status and a one-line message.
//! - Only store, status, clear, query, sql and schema connect to the database.
//! - Commands that change the working set only write a file when `--output`
//!   or `--in-place` is given.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use xcal_core::{
    default_log_level, init_logging, CannedQuery, EngineConfig, ExtractKind, FilterRequest,
    QueryReport, Session, Workbench,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "xcal", version)]
#[command(about = "Inspect, transform and store iCalendar files")]
struct Cli {
    /// JSON config file layered under environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the calendar transformation tool
    #[arg(long, global = true)]
    tool: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Absolute directory for rotated log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Run the tool's info check before loading a file
    #[arg(long, global = true)]
    validate: bool,

    /// Print machine-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the components of a calendar
    List { file: PathBuf },
    /// Print one component by 1-based position
    Show { file: PathBuf, position: usize },
    /// Print the tool's report for a calendar
    Info { file: PathBuf },
    /// List the to-dos of a calendar
    Todos { file: PathBuf },
    /// Drop to-dos by 1-based position
    RemoveTodos {
        file: PathBuf,
        #[arg(required = true)]
        positions: Vec<usize>,
        #[command(flatten)]
        target: Target,
    },
    /// Keep only events (optionally bounded) or only to-dos
    Filter {
        file: PathBuf,
        #[arg(long, conflicts_with_all = ["from", "to"])]
        todos: bool,
        #[arg(long, default_value = "")]
        from: String,
        #[arg(long, default_value = "")]
        to: String,
        #[command(flatten)]
        target: Target,
    },
    /// Merge another calendar into this one
    Combine {
        file: PathBuf,
        other: PathBuf,
        #[command(flatten)]
        target: Target,
    },
    /// Extract events or X-properties
    Extract { file: PathBuf, kind: ExtractArg },
    /// Store every component, or one by position, in the database
    Store {
        file: PathBuf,
        #[arg(long)]
        position: Option<usize>,
    },
    /// Row counts of the database relations
    Status,
    /// Delete every stored row
    Clear,
    /// Run a reporting query
    Query {
        #[command(subcommand)]
        query: QueryArg,
    },
    /// Run one read-only SQL statement
    Sql { statement: String },
    /// Describe the database relations
    Schema,
}

#[derive(Args)]
struct Target {
    /// Write the result to this file
    #[arg(long, conflicts_with = "in_place")]
    output: Option<PathBuf>,
    /// Overwrite the input file with the result
    #[arg(long)]
    in_place: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExtractArg {
    Events,
    XProperties,
}

impl From<ExtractArg> for ExtractKind {
    fn from(value: ExtractArg) -> Self {
        match value {
            ExtractArg::Events => Self::Events,
            ExtractArg::XProperties => Self::XProperties,
        }
    }
}

#[derive(Subcommand)]
enum QueryArg {
    /// Summaries of items whose organizer name matches a LIKE pattern
    Organizer { pattern: String },
    /// Number of events at a location
    Location { location: String },
    /// Events starting on or after "YYYY MM DD"
    After { date: String },
    /// To-dos with the given priority
    Priority { priority: String },
    /// To-dos with the highest priority
    Highest,
}

impl From<QueryArg> for CannedQuery {
    fn from(value: QueryArg) -> Self {
        match value {
            QueryArg::Organizer { pattern } => Self::ItemsOfOrganizer {
                name_pattern: pattern,
            },
            QueryArg::Location { location } => Self::EventCountAtLocation { location },
            QueryArg::After { date } => Self::EventsStartingAfter { date },
            QueryArg::Priority { priority } => Self::TodosWithPriority { priority },
            QueryArg::Highest => Self::TodosWithHighestPriority,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("xcal: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    if let Some(dir) = &config.log_dir {
        let level = config.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, dir)?;
    }

    let json = cli.json;
    info!("event=cli_command module=cli status=start");
    match cli.command {
        Commands::Store { file, position } => {
            let mut session = Session::open(&config)?;
            session.workbench_mut().open(&file)?;
            match position {
                Some(position) => {
                    let outcome = session.store_selected(position)?;
                    if json {
                        print_json(&outcome)?;
                    } else {
                        println!("{outcome}");
                    }
                }
                None => {
                    let summary = session.store_all()?.summary();
                    if json {
                        print_json(&summary)?;
                    } else {
                        println!("{summary}");
                    }
                }
            }
            if !json {
                print_counts(&session, false)?;
            }
        }
        Commands::Status => print_counts(&Session::open(&config)?, json)?,
        Commands::Clear => {
            let mut session = Session::open(&config)?;
            session.clear_db()?;
            print_counts(&session, json)?;
        }
        Commands::Query { query } => {
            let session = Session::open(&config)?;
            print_report(&session.run_query(&query.into())?, json)?;
        }
        Commands::Sql { statement } => {
            let session = Session::open(&config)?;
            print_report(&session.run_custom_query(&statement)?, json)?;
        }
        Commands::Schema => {
            let session = Session::open(&config)?;
            for (table, report) in session.describe_tables()? {
                println!("== {table}");
                print!("{report}");
            }
        }
        calendar_only => {
            let mut workbench = Workbench::from_config(&config)?;
            run_calendar(&mut workbench, calendar_only, json)?;
        }
    }

    info!("event=cli_command module=cli status=ok");
    Ok(())
}

/// Commands that never touch the database.
fn run_calendar(workbench: &mut Workbench, command: Commands, json: bool) -> CliResult<()> {
    match command {
        Commands::List { file } => {
            workbench.open(&file)?;
            let rows = workbench.rows();
            if json {
                print_json(&rows)?;
            } else {
                for row in rows {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        row.position,
                        row.kind,
                        row.property_count,
                        row.subcomponent_count,
                        row.summary
                    );
                }
            }
        }
        Commands::Show { file, position } => {
            workbench.open(&file)?;
            print!("{}", workbench.show_selected(position)?);
        }
        Commands::Info { file } => {
            workbench.open(&file)?;
            print!("{}", workbench.info()?);
        }
        Commands::Todos { file } => {
            workbench.open(&file)?;
            let candidates = workbench.todo_candidates();
            if json {
                print_json(&candidates)?;
            } else {
                for candidate in candidates {
                    println!("{}\t{}", candidate.position, candidate.summary);
                }
            }
        }
        Commands::RemoveTodos {
            file,
            positions,
            target,
        } => {
            workbench.open(&file)?;
            let report = workbench.remove_todos(&positions)?;
            println!("removed {} to-do(s), {:+} lines", report.removed, report.delta);
            write_target(workbench, &file, &target)?;
        }
        Commands::Filter {
            file,
            todos,
            from,
            to,
            target,
        } => {
            workbench.open(&file)?;
            let report = if todos {
                workbench.filter(FilterRequest::Todos)?
            } else {
                workbench.filter_events(&from, &to)?
            };
            println!("{} component(s), {:+} lines", report.records, report.delta);
            write_target(workbench, &file, &target)?;
        }
        Commands::Combine {
            file,
            other,
            target,
        } => {
            workbench.open(&file)?;
            let report = workbench.combine(&other)?;
            println!("{} component(s), {:+} lines", report.records, report.delta);
            write_target(workbench, &file, &target)?;
        }
        Commands::Extract { file, kind } => {
            workbench.open(&file)?;
            print!("{}", workbench.extract(kind.into())?);
        }
        Commands::Store { .. }
        | Commands::Status
        | Commands::Clear
        | Commands::Query { .. }
        | Commands::Sql { .. }
        | Commands::Schema => return Err("database command routed without a connection".into()),
    }
    Ok(())
}

/// File config, environment, then command-line flags.
fn load_config(cli: &Cli) -> CliResult<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(tool) = &cli.tool {
        config.tool_path = tool.clone();
    }
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = Some(level.clone());
    }
    if cli.validate {
        config.validate_on_open = true;
    }
    config.validate()?;
    Ok(config)
}

fn write_target(workbench: &mut Workbench, file: &Path, target: &Target) -> CliResult<()> {
    if let Some(output) = &target.output {
        workbench.save_as(output)?;
        println!("wrote {}", output.display());
    } else if target.in_place {
        workbench.save_as(file)?;
        println!("wrote {}", file.display());
    }
    Ok(())
}

fn print_counts(session: &Session, json: bool) -> CliResult<()> {
    let counts = session.count_db()?;
    if json {
        print_json(&counts)?;
    } else {
        println!(
            "organizers={} events={} todos={}",
            counts.organizers, counts.events, counts.todos
        );
    }
    Ok(())
}

fn print_report(report: &QueryReport, json: bool) -> CliResult<()> {
    if json {
        print_json(report)
    } else {
        print!("{report}");
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
