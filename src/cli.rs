use crate::{
    config::AppConfig,
    conflicts::{self, ConflictReport},
    deploy,
    installer::{InstallStatus, Installer, OverwritePolicy},
    library::{InstalledMod, Library, ModRepository},
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn default_filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

#[derive(Debug)]
struct GlobalOptions {
    format: OutputFormat,
    verbosity: Verbosity,
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Install { paths: Vec<PathBuf>, overwrite: bool },
    Uninstall(String),
    ModsList { enabled_only: bool },
    Enable(String),
    Disable(String),
    EnableAll,
    DisableAll,
    Conflicts,
    DepsMissing,
    Deploy,
    Paths,
    Help,
    Version,
}

struct Session {
    config: AppConfig,
    library: Library,
}

impl Session {
    fn open() -> Result<Self> {
        let config = AppConfig::load_or_create()?;
        let library = Library::load_or_create(&config.data_dir)?;
        Ok(Self { config, library })
    }
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, tokens) = parse_global_options(&args)?;
    init_logging(global.verbosity);

    let command = parse_command(&tokens)?;
    match command {
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("civforge v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let mut session = Session::open()?;
            run_command(&mut session, command, global.format)
        }
    }
}

fn init_logging(verbosity: Verbosity) {
    let env = env_logger::Env::default().default_filter_or(verbosity.default_filter());
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut format = OutputFormat::Text;
    let mut verbosity = Verbosity::Normal;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            format = OutputFormat::parse(value)
                .with_context(|| format!("Unknown format: {value} (use 'text' or 'json')"))?;
            continue;
        }
        match arg.as_str() {
            "--format" => {
                let value = iter.next().context("--format requires a value")?;
                format = OutputFormat::parse(value)
                    .with_context(|| format!("Unknown format: {value} (use 'text' or 'json')"))?;
            }
            "-v" | "--verbose" => verbosity = Verbosity::Verbose,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            _ => tokens.push(arg.to_string()),
        }
    }
    Ok((GlobalOptions { format, verbosity }, tokens))
}

fn parse_command(tokens: &[String]) -> Result<CliCommand> {
    let Some(head) = tokens.first() else {
        return Ok(CliCommand::Help);
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    let command = match head.as_str() {
        "help" | "--help" | "-h" => CliCommand::Help,
        "version" | "--version" | "-V" => CliCommand::Version,
        "install" => parse_install(rest)?,
        "uninstall" | "remove" => CliCommand::Uninstall(required_id(head, rest)?),
        "mods" => {
            let mut enabled_only = false;
            for arg in rest {
                match arg.as_str() {
                    "list" => {}
                    "--enabled" => enabled_only = true,
                    other => bail!("Unknown mods option: {other}"),
                }
            }
            CliCommand::ModsList { enabled_only }
        }
        "enable" => CliCommand::Enable(required_id(head, rest)?),
        "disable" => CliCommand::Disable(required_id(head, rest)?),
        "enable-all" => CliCommand::EnableAll,
        "disable-all" => CliCommand::DisableAll,
        "conflicts" => CliCommand::Conflicts,
        "deps" => {
            let sub = rest.first().map(|value| value.as_str()).unwrap_or("missing");
            if sub != "missing" {
                bail!("Unknown deps command: {sub} (use 'missing')");
            }
            CliCommand::DepsMissing
        }
        "deploy" => CliCommand::Deploy,
        "paths" => CliCommand::Paths,
        other => bail!("Unknown command: {other} (see 'civforge help')"),
    };
    Ok(command)
}

fn parse_install(args: &[String]) -> Result<CliCommand> {
    let mut overwrite = false;
    let mut paths = Vec::new();
    let mut stop_parsing = false;
    for arg in args {
        if stop_parsing {
            paths.push(PathBuf::from(arg));
            continue;
        }
        match arg.as_str() {
            "--" => stop_parsing = true,
            "--overwrite" | "-f" => overwrite = true,
            value if value.starts_with('-') => bail!("Unknown install option: {value}"),
            value => paths.push(PathBuf::from(value)),
        }
    }
    if paths.is_empty() {
        bail!("install requires one or more archive paths");
    }
    Ok(CliCommand::Install { paths, overwrite })
}

fn required_id(command: &str, args: &[String]) -> Result<String> {
    args.first()
        .cloned()
        .with_context(|| format!("{command} requires a mod id"))
}

fn run_command(session: &mut Session, command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::Install { paths, overwrite } => install(session, &paths, overwrite, format),
        CliCommand::Uninstall(mod_id) => uninstall(session, &mod_id),
        CliCommand::ModsList { enabled_only } => list_mods(&session.library, enabled_only, format),
        CliCommand::Enable(mod_id) => {
            session.library.set_enabled(&mod_id, true)?;
            println!("Enabled {mod_id}");
            Ok(())
        }
        CliCommand::Disable(mod_id) => {
            session.library.set_enabled(&mod_id, false)?;
            println!("Disabled {mod_id}");
            Ok(())
        }
        CliCommand::EnableAll => {
            session.library.set_all_enabled(true)?;
            println!("Enabled {} mod(s)", session.library.counts().total);
            Ok(())
        }
        CliCommand::DisableAll => {
            session.library.set_all_enabled(false)?;
            println!("Disabled {} mod(s)", session.library.counts().total);
            Ok(())
        }
        CliCommand::Conflicts => list_conflicts(&session.library, format),
        CliCommand::DepsMissing => list_missing_dependencies(&session.library, format),
        CliCommand::Deploy => deploy_mods(session, format),
        CliCommand::Paths => list_paths(&session.config, format),
        CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn install(
    session: &mut Session,
    paths: &[PathBuf],
    overwrite: bool,
    format: OutputFormat,
) -> Result<()> {
    let policy = if overwrite || !session.config.confirm_overwrite {
        OverwritePolicy::Replace
    } else {
        OverwritePolicy::Forbid
    };
    let installer = Installer::from_config(&session.config);
    let summary = installer.install_batch(paths, policy, &mut session.library);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            for outcome in &summary.outcomes {
                let archive = outcome.archive.display();
                match &outcome.status {
                    InstallStatus::Installed {
                        mod_id,
                        display_name,
                    } => println!("installed  {display_name} ({mod_id}) from {archive}"),
                    InstallStatus::Skipped { mod_id } => {
                        println!("skipped    {mod_id} is already installed ({archive}); use --overwrite")
                    }
                    InstallStatus::Failed { error } => println!("failed     {archive}: {error}"),
                }
            }
            println!(
                "{} installed, {} failed, {} skipped",
                summary.succeeded, summary.failed, summary.skipped
            );
        }
    }

    if summary.outcomes.is_empty() {
        bail!("no archives found to install");
    }
    if summary.failed > 0 {
        bail!("{} archive(s) failed to install", summary.failed);
    }
    Ok(())
}

fn uninstall(session: &mut Session, mod_id: &str) -> Result<()> {
    let entry = session
        .library
        .get(mod_id)
        .with_context(|| format!("mod {mod_id} is not installed"))?;
    let installer = Installer::from_config(&session.config);
    let removed = installer.uninstall_path(&entry.descriptor.source_path)?
        || installer.uninstall(mod_id)?;
    if !removed {
        log::warn!("no files found for {mod_id}; dropping the record only");
    }
    session.library.remove(mod_id)?;
    println!("Uninstalled {}", entry.descriptor.display_name);
    Ok(())
}

#[derive(Serialize)]
struct ModListItem<'a> {
    mod_id: &'a str,
    display_name: &'a str,
    version: &'a str,
    authors: &'a str,
    description: &'a str,
    affects_saves: bool,
    enabled: bool,
    installed_at: i64,
    has_conflicts: bool,
    source_path: &'a std::path::Path,
}

fn list_mods(library: &Library, enabled_only: bool, format: OutputFormat) -> Result<()> {
    let mods = library.list(enabled_only);
    let report = conflicts::analyze_installed(&library.mods);
    let items: Vec<ModListItem> = mods
        .iter()
        .map(|entry| ModListItem {
            mod_id: &entry.descriptor.mod_id,
            display_name: &entry.descriptor.display_name,
            version: &entry.descriptor.version,
            authors: &entry.descriptor.authors,
            description: &entry.descriptor.description,
            affects_saves: entry.descriptor.affects_saves,
            enabled: entry.enabled,
            installed_at: entry.installed_at,
            has_conflicts: report.has_conflicts(&entry.descriptor.mod_id),
            source_path: &entry.descriptor.source_path,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No mods installed.");
                return Ok(());
            }
            for item in &items {
                let enabled = if item.enabled { "x" } else { " " };
                let flag = if item.has_conflicts { "!" } else { " " };
                println!(
                    "[{enabled}]{flag} {name} ({id})  v{version}  by {authors}  {installed}",
                    name = item.display_name,
                    id = item.mod_id,
                    version = or_na(item.version),
                    authors = or_na(item.authors),
                    installed = format_date_cell(item.installed_at),
                );
            }
            let counts = library.counts();
            println!("{} mod(s), {} enabled", counts.total, counts.enabled);
        }
    }
    Ok(())
}

fn list_conflicts(library: &Library, format: OutputFormat) -> Result<()> {
    let report = conflicts::analyze_installed(&library.mods);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_conflicts(library, &report),
    }
    Ok(())
}

fn print_conflicts(library: &Library, report: &ConflictReport) {
    if report.is_empty() {
        println!("No conflicts among enabled mods.");
        return;
    }
    for (mod_id, entries) in report.iter() {
        println!("{}:", display_label(library, mod_id));
        for entry in entries {
            println!(
                "  {} <-> {}",
                entry.file,
                display_label(library, &entry.other_mod_id)
            );
        }
    }
}

fn display_label(library: &Library, mod_id: &str) -> String {
    match library.get(mod_id) {
        Some(InstalledMod { descriptor, .. }) if descriptor.display_name != mod_id => {
            format!("{} ({mod_id})", descriptor.display_name)
        }
        _ => mod_id.to_string(),
    }
}

#[derive(Serialize)]
struct MissingDependencyItem {
    required_by: String,
    dependency: String,
}

fn list_missing_dependencies(library: &Library, format: OutputFormat) -> Result<()> {
    let items: Vec<MissingDependencyItem> = library
        .missing_dependencies()
        .into_iter()
        .map(|(required_by, dependency)| MissingDependencyItem {
            required_by,
            dependency,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No missing dependencies.");
            }
            for item in items {
                println!("{} requires {}", item.required_by, item.dependency);
            }
        }
    }
    Ok(())
}

fn deploy_mods(session: &Session, format: OutputFormat) -> Result<()> {
    let report = deploy::deploy_enabled(&session.library.mods, &session.config.game_mods_dir)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => println!(
            "Deployed {} mod(s) to {} ({} old entries removed)",
            report.deployed.len(),
            session.config.game_mods_dir.display(),
            report.removed
        ),
    }
    Ok(())
}

#[derive(Serialize)]
struct PathsOutput {
    data_dir: String,
    storage_dir: String,
    game_mods_dir: String,
    temp_root: String,
    unrar_path: String,
}

fn list_paths(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let output = PathsOutput {
        data_dir: config.data_dir.display().to_string(),
        storage_dir: config.storage_dir.display().to_string(),
        game_mods_dir: config.game_mods_dir.display().to_string(),
        temp_root: config.temp_root().display().to_string(),
        unrar_path: config.unrar_path.display().to_string(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            println!("Data dir: {}", output.data_dir);
            println!("Mod storage: {}", output.storage_dir);
            println!("Game mods dir: {}", output.game_mods_dir);
            println!("Temp root: {}", output.temp_root);
            println!("unrar: {}", output.unrar_path);
        }
    }
    Ok(())
}

fn print_help() {
    println!("civforge v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  civforge install [--overwrite] <paths...>  Install archives or folders of archives");
    println!("  civforge uninstall <mod_id>                Remove an installed mod");
    println!("  civforge mods list [--enabled]             List installed mods");
    println!("  civforge enable <mod_id>                   Enable a mod");
    println!("  civforge disable <mod_id>                  Disable a mod");
    println!("  civforge enable-all | disable-all          Toggle every mod");
    println!("  civforge conflicts                         Show file conflicts between enabled mods");
    println!("  civforge deps missing                      List missing dependencies");
    println!("  civforge deploy                            Copy enabled mods into the game");
    println!("  civforge paths                             Show configured paths");
    println!();
    println!("Global options:");
    println!("  --format <json|text>                       Output format");
    println!("  -v, --verbose                              Debug logging");
    println!("  -q, --quiet                                Warnings and errors only");
    println!("  -h, --help                                 Show help");
    println!("  -V, --version                              Show version");
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

fn format_date_cell(timestamp: i64) -> String {
    format_short_date(timestamp).unwrap_or_else(|| "----------".to_string())
}

fn format_short_date(timestamp: i64) -> Option<String> {
    if timestamp <= 0 {
        return None;
    }
    let date = time::OffsetDateTime::from_unix_timestamp(timestamp).ok()?;
    let format = time::macros::format_description!("[year]-[month]-[day]");
    date.format(&format).ok()
}
