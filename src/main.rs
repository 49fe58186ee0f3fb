use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use autocrc::resolve::Fault;
use autocrc::{Config, Outcome, RunOptions, Source, Summary, Tally, TargetResolver, Verdict};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Exit status for errors that stop the run before any file is checked.
const FATAL_EXIT: u8 = 255;
/// Width of the text report; statuses are right-aligned to it.
const LINE_WIDTH: usize = 80;

#[derive(Parser)]
#[command(
    name = "autocrc",
    version,
    about = "CRC-check files using CRC-sums from filenames and SFV files",
    after_help = "Exit status is 0 if everything was OK. Otherwise it is the sum of 1 (CRC \
                  mismatch), 2 (missing files), 4 (read errors) and 8 (files without a \
                  CRC-sum). For fatal errors the exit status is 255."
)]
struct Cli {
    /// Files and directories to check (default: the working directory)
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// CRC-check recursively
    #[arg(short, long)]
    recursive: bool,
    /// Ignore case for sfv extensions and filenames parsed from sfv-files
    #[arg(short, long)]
    ignore_case: bool,
    /// Do not parse CRC-sums from filenames
    #[arg(short = 'c', long)]
    no_crc: bool,
    /// Do not parse CRC-sums from sfv-files
    #[arg(short = 's', long)]
    no_sfv: bool,
    /// Resolve relative PATHs against DIR
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,
    /// Only print errors and summaries
    #[arg(short, long)]
    quiet: bool,
    /// Print the calculated and expected CRC when they differ
    #[arg(short, long)]
    verbose: bool,
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Worker threads for the `parallel` build (0 = one per core)
    #[arg(short, long, default_value = "0")]
    jobs: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match check(&cli) {
        Ok(summary) => ExitCode::from(exit_status(&summary)),
        Err(e) => {
            eprintln!("autocrc: {e}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded; keep going without ours.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn check(cli: &Cli) -> Result<Summary, Box<dyn std::error::Error>> {
    let config = Config {
        paths:         cli.paths.clone(),
        recursive:     cli.recursive,
        ignore_case:   cli.ignore_case,
        filename_tags: !cli.no_crc,
        sfv:           !cli.no_sfv,
        base_dir:      cli.directory.clone(),
    };
    let targets = TargetResolver::new(config)?;
    let options = RunOptions { jobs: cli.jobs, ..RunOptions::default() };
    install_interrupt_handler(&options);

    let summary = match cli.format {
        OutputFormat::Text => {
            let mut report = TextReport::new(cli.quiet, cli.verbose);
            let summary = autocrc::run(targets, &options, |o| report.outcome(o));
            report.finish(&summary);
            summary
        }
        OutputFormat::Json => {
            let summary = autocrc::run(targets, &options, |o| print_json(&OutcomeRecord::from(o)));
            print_json(&SummaryRecord { ok: summary.is_ok(), summary });
            summary
        }
    };
    if options.cancel.load(Ordering::SeqCst) {
        eprintln!("autocrc: interrupted, summary covers the files checked so far");
    }
    Ok(summary)
}

/// Ctrl-C stops pulling new files; files being read finish and the partial
/// summary is still reported.
fn install_interrupt_handler(options: &RunOptions) {
    let cancel = options.cancel_handle();
    let installed = ctrlc::set_handler(move || {
        tracing::info!("interrupt received, finishing files in flight");
        cancel.store(true, Ordering::SeqCst);
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "cannot install interrupt handler");
    }
}

/// 1 = mismatch, 2 = missing, 4 = read error, 8 = no CRC-sum; summed.
fn exit_status(summary: &Summary) -> u8 {
    let mut status = 0;
    if summary.mismatched > 0 { status |= 1; }
    if summary.missing > 0 { status |= 2; }
    if summary.read_errors() > 0 { status |= 4; }
    if summary.no_checksum > 0 { status |= 8; }
    status
}

// ── Text report ──────────────────────────────────────────────────────────────

struct TextReport {
    quiet:       bool,
    verbose:     bool,
    current_dir: Option<PathBuf>,
    dir_tally:   Tally,
    dirs:        usize,
}

impl TextReport {
    fn new(quiet: bool, verbose: bool) -> Self {
        Self { quiet, verbose, current_dir: None, dir_tally: Tally::default(), dirs: 0 }
    }

    fn outcome(&mut self, outcome: &Outcome) {
        let dir = group_dir(outcome);
        if self.current_dir.as_deref() != Some(dir.as_path()) {
            self.end_directory();
            println!("Current directory: {}", display_dir(&dir));
            self.current_dir = Some(dir.clone());
            self.dirs += 1;
        }
        self.dir_tally.fold(outcome);

        if self.quiet && outcome.verdict == Verdict::Match {
            return;
        }
        println!("{}", status_line(&display_name(outcome, &dir), &self.status(outcome)));
    }

    fn status(&self, outcome: &Outcome) -> String {
        match outcome.verdict {
            Verdict::Match => "OK".to_owned(),
            Verdict::Mismatch => match (self.verbose, outcome.actual, outcome.target.expected) {
                (true, Some(actual), Some(expected)) => format!("{actual} != {expected}"),
                _ => "CRC mismatch".to_owned(),
            },
            Verdict::NoChecksumFound => match &outcome.target.fault {
                Some(Fault::Malformed(_)) => "Malformed sfv line".to_owned(),
                _                         => "No CRC-sum found".to_owned(),
            },
            Verdict::Unreadable if outcome.is_missing() => "No such file".to_owned(),
            Verdict::Unreadable => outcome
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Read error".to_owned()),
        }
    }

    fn end_directory(&mut self) {
        if self.current_dir.take().is_none() {
            return;
        }
        let s = std::mem::take(&mut self.dir_tally).summarize();
        println!("{}", "-".repeat(LINE_WIDTH));
        println!("{}", if s.is_ok() { "Everything OK" } else { "Errors occurred" });
        println!(
            "Tested {} files, Successful {}, Different {}, Missing {}, Read errors {}, No CRC-sum {}\n",
            s.total, s.matched, s.mismatched, s.missing, s.read_errors(), s.no_checksum
        );
    }

    fn finish(&mut self, total: &Summary) {
        self.end_directory();
        if total.total == 0 {
            println!("No CRC-sums found");
        } else if self.dirs > 1 {
            println!("{}", if total.is_ok() { "Everything OK" } else { "Errors occurred" });
            println!("  Tested\t {} files", total.total);
            println!("  Successful\t {} files", total.matched);
            println!("  Different\t {} files", total.mismatched);
            println!("  Missing\t {} files", total.missing);
            println!("  Read errors\t {} files", total.read_errors());
            println!("  No CRC-sum\t {} files", total.no_checksum);
        }
    }
}

/// Directory an outcome is reported under: the manifest's for manifest
/// entries, the file's own otherwise.
fn group_dir(outcome: &Outcome) -> PathBuf {
    let anchor = match &outcome.target.source {
        Source::Manifest { manifest, .. } => manifest.as_path(),
        Source::Filename                  => outcome.target.path.as_path(),
    };
    anchor.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn display_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() { ".".to_owned() } else { dir.display().to_string() }
}

fn display_name(outcome: &Outcome, dir: &Path) -> String {
    let path = &outcome.target.path;
    let name = path.strip_prefix(dir).unwrap_or(path).display().to_string();
    match (&outcome.target.fault, &outcome.target.source) {
        (Some(Fault::Malformed(_)), Source::Manifest { line, .. }) => format!("{name}:{line}"),
        _ => name,
    }
}

fn status_line(name: &str, status: &str) -> String {
    let width = LINE_WIDTH
        .saturating_sub(name.chars().count() + 1)
        .max(status.chars().count());
    format!("{name} {status:>width$}")
}

// ── JSON report ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OutcomeRecord<'a> {
    path:     &'a Path,
    verdict:  Verdict,
    expected: Option<autocrc::Checksum>,
    actual:   Option<autocrc::Checksum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line:     Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:    Option<String>,
}

impl<'a> From<&'a Outcome> for OutcomeRecord<'a> {
    fn from(o: &'a Outcome) -> Self {
        let (manifest, line) = match &o.target.source {
            Source::Manifest { manifest, line } => (Some(manifest.as_path()), Some(*line)),
            Source::Filename                    => (None, None),
        };
        let error = match &o.target.fault {
            Some(Fault::Malformed(reason)) => Some(reason.clone()),
            _                              => o.error.as_ref().map(|e| e.message.clone()),
        };
        OutcomeRecord {
            path: &o.target.path,
            verdict: o.verdict,
            expected: o.target.expected,
            actual: o.actual,
            manifest,
            line,
            error,
        }
    }
}

#[derive(Serialize)]
struct SummaryRecord {
    ok:      bool,
    summary: Summary,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e)   => tracing::error!(error = %e, "cannot encode report line"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_bits() {
        assert_eq!(exit_status(&Summary::default()), 0);
        let all = Summary { total: 5, matched: 1, mismatched: 1, no_checksum: 1, unreadable: 2, missing: 1 };
        assert_eq!(exit_status(&all), 1 | 2 | 4 | 8);
        let read_error = Summary { total: 1, unreadable: 1, ..Summary::default() };
        assert_eq!(exit_status(&read_error), 4);
    }

    #[test]
    fn status_is_right_aligned() {
        let line = status_line("file.bin", "OK");
        assert_eq!(line.chars().count(), LINE_WIDTH);
        assert!(line.starts_with("file.bin "));
        assert!(line.ends_with(" OK"));
    }

    #[test]
    fn long_names_still_get_a_separator() {
        let name = "x".repeat(100);
        assert_eq!(status_line(&name, "OK"), format!("{name} OK"));
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from(["autocrc", "-r", "-i", "-q", "--format", "json", "a", "b"]);
        assert!(cli.recursive && cli.ignore_case && cli.quiet);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }
}
