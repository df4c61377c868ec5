//! vellum - Inspect EPUB and web publication manifests

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vellum::{Publication, model::LinkListExt};

#[derive(Parser)]
#[command(name = "vellum")]
#[command(version, about = "Print the manifest of an EPUB or web publication", long_about = None)]
#[command(after_help = "EXAMPLES:
    vellum book.epub              Print the manifest as JSON
    vellum --pretty book.epub     Print the manifest as indented JSON
    vellum -i book/               Summarize an exploded publication

Log verbosity can also be set with RUST_LOG (e.g. RUST_LOG=vellum=debug).")]
struct Cli {
    /// Input publication (EPUB file, packaged web publication, or directory)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Show a summary instead of the manifest
    #[arg(short, long)]
    info: bool,

    /// Indent the JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Log parsing details to stderr
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = Publication::open(&cli.input).map_err(|e| e.to_string()).and_then(|publication| {
        if cli.info {
            show_info(&cli.input, &publication);
            Ok(())
        } else {
            print_manifest(&publication, cli.pretty)
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_manifest(publication: &Publication, pretty: bool) -> Result<(), String> {
    let manifest = &publication.manifest;
    let json = if pretty {
        manifest.to_json_string_pretty()
    } else {
        serde_json::to_string(&manifest.to_json()).map_err(vellum::Error::from)
    };
    println!("{}", json.map_err(|e| e.to_string())?);
    Ok(())
}

fn show_info(path: &str, publication: &Publication) {
    let manifest = &publication.manifest;
    let meta = &manifest.metadata;

    println!("File: {path}");
    println!("Title: {}", meta.title.string());
    if !meta.authors.is_empty() {
        let authors: Vec<&str> = meta.authors.iter().map(|a| a.name.string()).collect();
        println!("Authors: {}", authors.join(", "));
    }
    if !meta.languages.is_empty() {
        println!("Language: {}", meta.languages.join(", "));
    }
    if let Some(identifier) = &meta.identifier {
        println!("Identifier: {identifier}");
    }
    if let Some(desc) = &meta.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((end, _)) => println!("Description: {}...", &desc[..end]),
            None => println!("Description: {desc}"),
        }
    }
    println!(
        "Reading progression: {}",
        meta.effective_reading_progression().as_str()
    );
    let profiles: Vec<String> = meta.conforms_to.iter().map(ToString::to_string).collect();
    if !profiles.is_empty() {
        println!("Profiles: {}", profiles.join(", "));
    }
    println!("Reading order: {}", manifest.reading_order.len());
    println!("Resources: {}", manifest.resources.len());
    println!("TOC entries: {}", manifest.table_of_contents().len());
    for (role, collections) in &manifest.subcollections {
        let links: usize = collections.iter().map(|c| c.links.len()).sum();
        println!("  {role}: {links} links");
    }
    if let Some(cover) = manifest.resources.first_with_rel("cover") {
        println!("Cover: {}", cover.href);
    }
    println!("Layout: {}", publication.presentation.layout());
    for (setting, value) in publication.presentation.settings() {
        println!("  {}: {value}", setting.css_variable());
    }
}
