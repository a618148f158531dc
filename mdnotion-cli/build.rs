use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of build_cli() in src/main.rs
// We need to duplicate this here since build scripts can't access src/ modules
fn build_cli() -> Command {
    let flag = |name: &'static str, help: &'static str| {
        Arg::new(name)
            .long(name)
            .help(help)
            .action(ArgAction::SetTrue)
    };

    Command::new("mdnotion")
        .about("Sync a Markdown document to a Notion page")
        .disable_version_flag(true)
        .arg(
            Arg::new("md")
                .long("md")
                .value_name("PATH")
                .help("Path to the Markdown file")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .value_name("ID")
                .help("Target Notion page ID"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("Notion integration token"),
        )
        .arg(flag("append", "Append content to the bottom of the existing page"))
        .arg(flag("replace", "Replace all existing content with new content"))
        .arg(flag("use-hash", "Skip the sync when the stored content hash matches"))
        .arg(
            Arg::new("hash-property")
                .long("hash-property")
                .value_name("NAME")
                .help("Page property holding the content hash"),
        )
        .arg(flag("hash-block", "Store the content hash in a metadata block"))
        .arg(
            Arg::new("rewrite-text")
                .long("rewrite-text")
                .value_name("PATH")
                .help("JSON file mapping text to rewrite")
                .value_hint(ValueHint::FilePath),
        )
        .arg(flag("dry-run", "Run all logic except the Notion sync"))
        .arg(flag("debug", "Enable debug output"))
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

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = build_cli();

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "mdnotion", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "mdnotion", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "mdnotion", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
