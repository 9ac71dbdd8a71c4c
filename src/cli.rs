use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Parser, Debug)]
#[command(
    name = "stream-stats",
    version,
    about = "Daily streaming-statistics engine: deltas, history series and milestone projections",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding `<date>_songs.csv`, `<date>_albums.csv` and `<date>_meta.json`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Show the latest snapshot summary",
        after_help = "EXAMPLES:\n    stream-stats summary\n    stream-stats summary --top 20 --json"
    )]
    Summary(SummaryArgs),

    #[command(
        about = "Print one history series",
        after_help = "EXAMPLES:\n    stream-stats history career\n    stream-stats history song \"7 rings\"\n    stream-stats history album Positions --json"
    )]
    History(HistoryArgs),

    #[command(
        about = "Show next-milestone projections",
        after_help = "EXAMPLES:\n    stream-stats projections\n    stream-stats projections --songs 25"
    )]
    Projections(ProjectionArgs),

    #[command(about = "Show resolved paths, config and discovered snapshot files")]
    Status,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    /// Number of songs listed in the daily table (defaults to config `display.top_songs`).
    #[arg(long)]
    top: Option<usize>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[command(subcommand)]
    series: SeriesArg,
}

#[derive(Subcommand, Debug)]
enum SeriesArg {
    /// Artist-wide daily increments from metadata career totals.
    Career,
    /// Monthly listener counts.
    Listeners,
    /// Daily increments of one song.
    Song { name: String },
    /// Daily increments of one album, by base name.
    Album { base_name: String },
}

#[derive(Args, Debug)]
struct ProjectionArgs {
    /// Number of song projections to list.
    #[arg(long, default_value_t = 10)]
    songs: usize,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}: {}", report.command, if report.ok { "ok" } else { "issues" });
    for line in &report.details {
        println!("  {line}");
    }
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone();

    let report = match cli.command {
        Commands::Summary(args) => commands::summary::run(&commands::summary::SummaryOptions {
            data_dir,
            top: args.top,
        })?,
        Commands::History(args) => {
            let series = match args.series {
                SeriesArg::Career => commands::history::SeriesSelector::Career,
                SeriesArg::Listeners => commands::history::SeriesSelector::Listeners,
                SeriesArg::Song { name } => commands::history::SeriesSelector::Song(name),
                SeriesArg::Album { base_name } => {
                    commands::history::SeriesSelector::Album(base_name)
                }
            };
            commands::history::run(&commands::history::HistoryOptions { data_dir, series })?
        }
        Commands::Projections(args) => {
            commands::projections::run(&commands::projections::ProjectionOptions {
                data_dir,
                songs: args.songs,
            })?
        }
        Commands::Status => commands::status::run(data_dir)?,
    };

    render(&report, cli.json)
}
