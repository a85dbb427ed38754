//! `scan` and `import` commands

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use kicadimport::store::FsLibraryDb;
use kicadimport::{
    CheckState, ImportController, ImportEvent, ImportSettings, MessageLogger, PipelineResult,
    Severity, State,
};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Arguments for the `scan` command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// KiCad library directory, `*.pretty` directory, `*.kicad_sym` or `*.kicad_mod` file
    #[arg(value_name = "PATH", value_hint = clap::ValueHint::AnyPath)]
    pub path: PathBuf,

    /// Directory containing `*.3dshapes` libraries (defaults to PATH)
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub shapes3d: Option<PathBuf>,

    /// Library directory used to detect elements imported before
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub dest: Option<PathBuf>,
}

/// Arguments for the `import` command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// KiCad library directory, `*.pretty` directory, `*.kicad_sym` or `*.kicad_mod` file
    #[arg(value_name = "PATH", value_hint = clap::ValueHint::AnyPath)]
    pub path: PathBuf,

    /// Library directory to write the elements to
    #[arg(short, long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub dest: PathBuf,

    /// Directory containing `*.3dshapes` libraries (defaults to PATH)
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub shapes3d: Option<PathBuf>,

    /// Prefix prepended to the name of every element
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Import settings file (TOML)
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Symbol or footprint not to import, can be given multiple times
    #[arg(long, value_name = "LIB:NAME")]
    pub exclude: Vec<String>,
}

/// Execute the `scan` command
pub fn execute_scan(args: ScanArgs) -> Result<()> {
    if !args.path.exists() {
        bail!("Path does not exist: {}", args.path.display());
    }
    let roots: Vec<PathBuf> = args.dest.iter().cloned().collect();
    let db = Arc::new(FsLibraryDb::new(roots));
    db.rescan();
    let dest = args.dest.unwrap_or_default();
    let mut ctrl = ImportController::new(db, dest, ImportSettings::default(), MessageLogger::new());

    ctrl.start_scan(&args.path, args.shapes3d.as_deref());
    ctrl.wait();
    if !ctrl.can_start_parsing() {
        bail!("No KiCad libraries found in {}", args.path.display());
    }
    ctrl.start_parse();
    ctrl.wait();
    if ctrl.state() != State::Parsed {
        bail!("Parsing failed");
    }

    print_result(ctrl.result());
    Ok(())
}

fn print_result(result: &PipelineResult) {
    let marker = |imported: bool| if imported { " (imported)" } else { "" };
    for lib in &result.symbol_libs {
        println!("{} ({} symbols)", lib.name(), lib.symbols.len());
        for sym in &lib.symbols {
            let base = if sym.extends.is_empty() {
                String::new()
            } else {
                format!(" extends {}", sym.extends)
            };
            println!(
                "  {}{}{}",
                sym.name,
                base,
                marker(sym.dev_already_imported)
            );
        }
    }
    for lib in &result.footprint_libs {
        println!("{}.pretty ({} footprints)", lib.name(), lib.footprints.len());
        for fp in &lib.footprints {
            println!("  {}{}", fp.name, marker(fp.already_imported));
        }
    }
    for lib in &result.package_3d_libs {
        println!(
            "{} ({} STEP files)",
            lib.dir.file_name().unwrap_or_default().to_string_lossy(),
            lib.step_files.len()
        );
    }
}

/// Split a `LIB:NAME` exclusion
fn parse_exclusion(exclusion: &str) -> Result<(&str, &str)> {
    match exclusion.split_once(':') {
        Some((lib, name)) if !lib.is_empty() && !name.is_empty() => Ok((lib, name)),
        _ => bail!("Invalid exclusion '{}', expected LIB:NAME", exclusion),
    }
}

fn load_settings(args: &ImportArgs) -> Result<ImportSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            log::debug!("Loading settings from {}", path.display());
            ImportSettings::load(path)
                .with_context(|| format!("Failed to load settings: {}", path.display()))?
        }
        None => ImportSettings::default(),
    };
    if let Some(prefix) = &args.prefix {
        settings.name_prefix = prefix.clone();
    }
    Ok(settings)
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn run_stage(ctrl: &mut ImportController, expected: State) -> Result<()> {
    ctrl.wait();
    match ctrl.state() {
        state if state == expected => Ok(()),
        State::Reset | State::Scanned => bail!("Aborted"),
        state => bail!("Unexpected state {:?}", state),
    }
}

/// Execute the `import` command
pub fn execute_import(args: ImportArgs) -> Result<()> {
    if !args.path.exists() {
        bail!("Path does not exist: {}", args.path.display());
    }
    let exclusions = args
        .exclude
        .iter()
        .map(|e| parse_exclusion(e))
        .collect::<Result<Vec<_>>>()?;
    let settings = load_settings(&args)?;
    fs::create_dir_all(&args.dest)
        .with_context(|| format!("Failed to create directory: {}", args.dest.display()))?;

    let db = Arc::new(FsLibraryDb::new([args.dest.clone()]));
    let count = db.rescan();
    log::debug!("Destination library contains {} elements", count);

    let mut ctrl = ImportController::new(db, &args.dest, settings, MessageLogger::new());
    let abort = ctrl.abort_handle();
    ctrlc::set_handler(move || abort.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    let pb = progress_bar()?;
    let bar = pb.clone();
    ctrl.events().subscribe(move |event| match event {
        ImportEvent::ProgressPercent(percent) => bar.set_position(u64::from(*percent)),
        ImportEvent::ProgressStatus(status) => bar.set_message(status.clone()),
        _ => {}
    });

    ctrl.start_scan(&args.path, args.shapes3d.as_deref());
    run_stage(&mut ctrl, State::Scanned)?;
    if !ctrl.can_start_parsing() {
        bail!("No KiCad libraries found in {}", args.path.display());
    }

    ctrl.start_parse();
    run_stage(&mut ctrl, State::Parsed)?;
    for (lib, name) in exclusions {
        ctrl.set_device_checked(lib, name, false);
        ctrl.set_component_checked(lib, name, false);
        ctrl.set_symbol_checked(lib, name, false);
        ctrl.set_package_checked(lib, name, false);
    }
    report_implicit(ctrl.result());
    if !ctrl.can_start_import() {
        pb.finish_and_clear();
        eprintln!("Nothing to import, all selected elements exist already.");
        return Ok(());
    }

    ctrl.start_import();
    let finished = run_stage(&mut ctrl, State::Imported);
    pb.finish_and_clear();
    finished?;

    let summary = ctrl.import_summary().unwrap_or_default();
    eprintln!(
        "Imported {} of {} element(s) into {}",
        summary.imported,
        summary.total,
        args.dest.display()
    );
    report_messages(ctrl.log());
    Ok(())
}

/// Mention excluded elements which are still needed by other elements
fn report_implicit(result: &PipelineResult) {
    for lib in &result.footprint_libs {
        for fp in &lib.footprints {
            if fp.checked == CheckState::ImplicitlyChecked {
                log::info!("{}:{} is imported as it is needed by a device", lib.name(), fp.name);
            }
        }
    }
}

fn report_messages(log: &MessageLogger) {
    let warnings = log.count(Severity::Warning);
    let errors = log.count(Severity::Critical);
    if warnings + errors > 0 {
        eprintln!("{} warning(s), {} error(s), see messages above", warnings, errors);
    }
}
