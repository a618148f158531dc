// Command-line interface for mdnotion
//
// This binary syncs one Markdown document to one Notion page. All conversion and sync logic
// lives in the mdnotion crate; this file only wires flags and configuration into it and
// reports the outcome.
//
// Usage:
//  mdnotion --md <file> --page <id> [--token <token>] [--append | --replace]
//           [--use-hash [--hash-property <name> | --hash-block]] [--rewrite-text <mapping.json>]
//           [--dry-run] [--debug] [--config <path>]
//  mdnotion -v | --version
//
// Configuration is layered: embedded defaults, ./mdnotion.toml, --config, MDNOTION_* env vars,
// then the flags above.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::{debug, LevelFilter};
use mdnotion::{
    DryRunUploader, MarkdownConverter, NotionClient, NotionSettings, Pipeline, PipelineError,
    SyncOptions, SyncReport, SyncState,
};
use mdnotion_config::{LoadError, Loader, MdNotionConfig};
use std::path::{Path, PathBuf};

fn build_cli() -> Command {
    Command::new("mdnotion")
        .about("Sync a Markdown document to a Notion page")
        .long_about(
            "mdnotion converts a Markdown document into Notion blocks and writes them to a page.\n\n\
            A leading top-level heading becomes the page title. Local images are uploaded to\n\
            Notion, remote images are linked. With --use-hash the sync is skipped when the\n\
            document has not changed since the last run.\n\n\
            Examples:\n  \
            mdnotion --md README.md --page <id> --token <token>\n  \
            mdnotion --md README.md --page <id> --replace --use-hash\n  \
            mdnotion --md README.md --page <id> --dry-run",
        )
        .disable_version_flag(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("md")
                .long("md")
                .value_name("PATH")
                .help("Path to the Markdown file")
                .required_unless_present("version")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .value_name("ID")
                .help("Target Notion page ID")
                .required_unless_present("version"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("Notion integration token (or MDNOTION_NOTION__TOKEN)"),
        )
        .arg(
            Arg::new("append")
                .long("append")
                .help("Append content to the bottom of the existing page (default)")
                .action(ArgAction::SetTrue)
                .conflicts_with("replace"),
        )
        .arg(
            Arg::new("replace")
                .long("replace")
                .help("Replace all existing content with new content")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("use-hash")
                .long("use-hash")
                .help("Skip the sync when the stored content hash matches the document")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("hash-property")
                .long("hash-property")
                .value_name("NAME")
                .help("Page property holding the content hash (default: \"Content Hash\")")
                .conflicts_with("hash-block"),
        )
        .arg(
            Arg::new("hash-block")
                .long("hash-block")
                .help("Store the content hash in a metadata block instead of a property")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rewrite-text")
                .long("rewrite-text")
                .value_name("PATH")
                .help("JSON file mapping text to rewrite in the Markdown before conversion")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Run all logic except the Notion sync (no changes are made)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a mdnotion.toml configuration file")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
}

/// How much the binary logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Normal,
    Debug,
}

impl Verbosity {
    fn from_debug(debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    fn level(self) -> LevelFilter {
        match self {
            Verbosity::Normal => LevelFilter::Warn,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::new()
        .filter_level(verbosity.level())
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();
}

fn main() {
    let matches = build_cli().get_matches();

    if matches.get_flag("version") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let config = load_cli_config(&matches);
    init_logging(Verbosity::from_debug(config.log.debug));

    let md_path = PathBuf::from(required(&matches, "md"));
    let page_id = required(&matches, "page");
    let rewrite_mapping = matches.get_one::<String>("rewrite-text").map(PathBuf::from);

    debug!(
        "Given: --md '{}' --page '{page_id}' --token '{}' --mode {:?} --use-hash {} --rewrite-text '{}'",
        md_path.display(),
        if config.notion.token.is_some() { "<redacted>" } else { "" },
        config.sync.mode,
        config.hash.enabled,
        rewrite_mapping
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    );

    let options = config.sync_options(rewrite_mapping);
    if options.dry_run {
        handle_dry_run(&md_path, &options);
    } else {
        handle_sync(&md_path, page_id, &options, &config);
    }
}

/// Value of a flag clap already enforces as required.
fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    match matches.get_one::<String>(name) {
        Some(value) => value,
        None => {
            eprintln!("Missing required argument --{name}");
            std::process::exit(1);
        }
    }
}

fn handle_dry_run(md_path: &Path, options: &SyncOptions) {
    let pipeline = Pipeline::new(options, &MarkdownConverter, &DryRunUploader);
    let report = pipeline.dry_run(md_path).unwrap_or_else(|err| fail(err));

    println!("[DRY RUN] All parsing, conversion, and hash logic completed. No changes made to Notion.");
    print_summary(&report);
}

fn handle_sync(md_path: &Path, page_id: &str, options: &SyncOptions, config: &MdNotionConfig) {
    let Some(token) = config.notion.token.as_deref() else {
        eprintln!("Error: no Notion token given. Use --token or set MDNOTION_NOTION__TOKEN.");
        std::process::exit(1);
    };

    let settings = NotionSettings::from(&config.notion);
    let client = NotionClient::new(token, &settings).unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        std::process::exit(1);
    });

    let pipeline = Pipeline::new(options, &MarkdownConverter, &client);
    let report = pipeline
        .sync(md_path, page_id, &client)
        .unwrap_or_else(|err| fail(err));

    match report.state {
        SyncState::Skipped => println!("No content change detected. Skipping update."),
        _ => println!("✅ Page updated successfully."),
    }
    print_summary(&report);
}

fn print_summary(report: &SyncReport) {
    if let Some(title) = &report.title {
        println!("Title: {title}");
    }
    println!("Blocks: {}", report.block_count);
    println!("Content hash: {}", report.digest);
    if report.removed > 0 {
        println!("Removed blocks: {}", report.removed);
    }
}

fn fail(err: PipelineError) -> ! {
    eprintln!("Error: {}", err.source);
    debug!("Pipeline stopped after state '{}'", err.reached);
    std::process::exit(1);
}

fn load_cli_config(matches: &ArgMatches) -> MdNotionConfig {
    let loader = Loader::new().with_optional_file("mdnotion.toml");
    let loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader,
    };

    let loader = apply_flag_overrides(loader.with_env(), matches).unwrap_or_else(|err| {
        eprintln!("Failed to apply command-line options: {err}");
        std::process::exit(1);
    });

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// Layer explicitly given flags over the loaded configuration.
fn apply_flag_overrides(
    mut loader: Loader,
    matches: &ArgMatches,
) -> Result<Loader, LoadError> {
    if let Some(token) = matches.get_one::<String>("token") {
        loader = loader.set_override("notion.token", token.as_str())?;
    }
    if matches.get_flag("replace") {
        loader = loader.set_override("sync.mode", "replace")?;
    } else if matches.get_flag("append") {
        loader = loader.set_override("sync.mode", "append")?;
    }
    if matches.get_flag("use-hash") {
        loader = loader.set_override("hash.enabled", true)?;
    }
    if let Some(name) = matches.get_one::<String>("hash-property") {
        loader = loader
            .set_override("hash.store", "property")?
            .set_override("hash.property", name.as_str())?;
    }
    if matches.get_flag("hash-block") {
        loader = loader.set_override("hash.store", "block")?;
    }
    if matches.get_flag("dry-run") {
        loader = loader.set_override("sync.dry_run", true)?;
    }
    if matches.get_flag("debug") {
        loader = loader.set_override("log.debug", true)?;
    }
    Ok(loader)
}
