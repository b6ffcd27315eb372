use std::fs;
use std::io::{self, BufRead, Read};
use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use tempotype::aht::Estimate;
use tempotype::keyboard::find_first_unsupported_char;
use tempotype::pacing::PacerConfig;
use tempotype::sched::WallClock;
use tempotype::script::{format_timestamp, ClipScript};
use tempotype::session::{Command as ControlCommand, Session, SessionConfig, SessionContext, SessionState};
use tempotype::transport::{ConsoleTransport, SharedPauseFlag};
use tempotype::typist::{TypistConfig, TypoStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TypoStyleArg {
    /// A uniformly random lowercase letter.
    Random,
    /// A QWERTY-adjacent key, case preserved.
    Adjacent,
}

impl TypoStyleArg {
    fn to_library(self) -> TypoStyle {
        match self {
            TypoStyleArg::Random => TypoStyle::RandomLetter,
            TypoStyleArg::Adjacent => TypoStyle::Adjacent,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tempotype")]
#[command(about = "Paced human-like typer for clip-annotated scripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a clip script and print its handle-time estimate
    Estimate {
        /// Input script file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Difficulty multiplier (clamped to 1.0..=7.0)
        #[arg(long, default_value_t = 1.0)]
        difficulty: f64,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the clips found in a script
    Clips {
        /// Input script file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Emit the clip list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Type a clip script through the console transport
    Run {
        /// Input script file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Difficulty multiplier (clamped to 1.0..=7.0)
        #[arg(long, default_value_t = 1.0)]
        difficulty: f64,

        /// Optional RNG seed (for reproducible runs)
        #[arg(long)]
        seed: Option<u64>,

        /// Typo probability per word (0.0-1.0)
        #[arg(long, default_value_t = 0.15)]
        typo_chance: f64,

        /// How mistyped characters are chosen
        #[arg(long, value_enum, default_value_t = TypoStyleArg::Adjacent)]
        typo_style: TypoStyleArg,

        /// Start typing immediately instead of waiting for a resume toggle
        #[arg(long)]
        start_unpaused: bool,
    },
}

#[derive(Debug, Serialize)]
struct EstimateReport {
    clips: usize,
    total_duration_seconds: f64,
    total_duration_minutes: f64,
    difficulty: f64,
    estimate: Estimate,
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_script(path: &PathBuf) -> Result<ClipScript> {
    let source = read_input(path)?;
    let script = ClipScript::parse(&source)?;

    for clip in script.clips() {
        if let Some((_, c)) = find_first_unsupported_char(&clip.text) {
            log::warn!(
                "clip {} contains unsupported character {c:?} (U+{:04X}); it will be sent as-is",
                clip.index,
                c as u32
            );
        }
    }

    Ok(script)
}

fn spawn_control_reader() -> mpsc::Receiver<ControlCommand> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match ControlCommand::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => {
                    if !line.trim().is_empty() {
                        eprintln!("Unknown command. Available: 'd X.XX' (difficulty), 's' (status), 'r' (reset section)");
                    }
                }
            }
        }
    });
    rx
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn run_session(
    script: ClipScript,
    difficulty: f64,
    seed: Option<u64>,
    typo_chance: f64,
    typo_style: TypoStyle,
    start_unpaused: bool,
) -> Result<()> {
    let typist_config = TypistConfig {
        typo_chance,
        typo_style,
        ..Default::default()
    };

    let mut session = Session::new(
        script,
        SessionConfig::default(),
        PacerConfig::default(),
        typist_config,
        difficulty,
    )?;

    let estimate = session.estimate();
    eprintln!(
        "Handle-time envelope: {:.1} / {:.1} / {:.1} minutes (lower/target/upper)",
        estimate.lower_bound, estimate.target, estimate.upper_bound
    );
    eprintln!("Commands: 'd X.XX' set difficulty, 's' status, 'r' reset section");
    eprintln!("Ctrl+C toggles pause/resume; the run starts {}.", if start_unpaused { "immediately" } else { "paused" });

    let pause_flag = SharedPauseFlag::new(!start_unpaused);
    pause_flag.install_ctrlc_toggle()?;

    let commands = spawn_control_reader();

    let mut transport = ConsoleTransport::new();
    let mut sched = WallClock::new();
    let mut rng = rng_from_seed(seed);

    loop {
        let mut ctx = SessionContext {
            transport: &mut transport,
            signal: &pause_flag,
            sched: &mut sched,
            rng: &mut rng,
        };

        while let Ok(command) = commands.try_recv() {
            session.handle_command(command, &mut ctx);
        }

        if session.step(&mut ctx)? == SessionState::AllComplete {
            break;
        }
    }

    eprintln!("\nAll clips completed.");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Estimate {
            input,
            difficulty,
            json,
        } => {
            let script = load_script(&input)?;

            let mut estimator = tempotype::aht::AhtEstimator::new(script.total_duration_minutes());
            estimator.set_difficulty(difficulty);

            let report = EstimateReport {
                clips: script.len(),
                total_duration_seconds: script.total_duration_seconds(),
                total_duration_minutes: script.total_duration_minutes(),
                difficulty: estimator.difficulty(),
                estimate: estimator.estimate(),
            };

            if json {
                let out = serde_json::to_string_pretty(&report)
                    .context("failed to serialize estimate report")?;
                println!("{out}");
            } else {
                println!(
                    "{} clips, {:.1} minutes of source material",
                    report.clips, report.total_duration_minutes
                );
                println!(
                    "Estimated handle time at difficulty {:.2}x: {:.1} / {:.1} / {:.1} minutes (lower/target/upper)",
                    report.difficulty,
                    report.estimate.lower_bound,
                    report.estimate.target,
                    report.estimate.upper_bound
                );
            }
        }
        Command::Clips { input, json } => {
            let script = load_script(&input)?;

            if json {
                let out = serde_json::to_string_pretty(script.clips())
                    .context("failed to serialize clip list")?;
                println!("{out}");
            } else {
                for clip in script.clips() {
                    println!(
                        "Clip #{} <{}-{}> {} chars",
                        clip.index,
                        format_timestamp(clip.span.start_seconds),
                        format_timestamp(clip.span.end_seconds),
                        clip.text.chars().count()
                    );
                }
                println!(
                    "{} clips, total {:.1} minutes",
                    script.len(),
                    script.total_duration_minutes()
                );
            }
        }
        Command::Run {
            input,
            difficulty,
            seed,
            typo_chance,
            typo_style,
            start_unpaused,
        } => {
            let script = load_script(&input)?;
            run_session(
                script,
                difficulty,
                seed,
                typo_chance,
                typo_style.to_library(),
                start_unpaused,
            )?;
        }
    }

    Ok(())
}
