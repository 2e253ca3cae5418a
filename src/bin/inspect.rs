//! Tracking Plan Inspector CLI
//!
//! Compiles event schemas and prints what generators would see: the AST,
//! the custom type registry, and the identifiers allocated per language.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use typer_schema::codegen::FieldType;
use typer_schema::config::OutputFormat;
use typer_schema::{AnalyticsCall, Build, CompiledEvent, Language, TyperConfig};

#[derive(Parser)]
#[command(name = "typer-inspect")]
#[command(about = "Inspect how tracking-plan schemas compile")]
struct Cli {
    /// Config file (defaults to typer.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled AST of every event
    Ast {
        /// Event schema file or directory (defaults to [plan] path)
        path: Option<PathBuf>,

        /// Which part of the event to print
        #[arg(short, long, value_enum, default_value = "full")]
        section: Section,
    },

    /// Print the custom type registry of every event
    Types {
        path: Option<PathBuf>,
    },

    /// Print the identifiers allocated for event payloads
    Names {
        path: Option<PathBuf>,

        /// Target language (defaults to [codegen] languages)
        #[arg(short, long, value_enum)]
        language: Option<Language>,

        /// Analytics call the events are sent through
        #[arg(long, default_value = "track")]
        call: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Section {
    Full,
    Properties,
    Traits,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = TyperConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let format = config.output.format;

    match cli.command {
        Commands::Ast { path, section } => {
            let build = compile_plan(&config, path)?;
            for event in build.events() {
                let node = match section {
                    Section::Full => &event.schema,
                    Section::Properties => &event.properties,
                    Section::Traits => &event.traits,
                };
                println!("# {}", event.label);
                println!("{}", render(node, format)?);
            }
            Ok(())
        }

        Commands::Types { path } => {
            let build = compile_plan(&config, path)?;
            for event in build.events() {
                println!("# {} ({} custom types)", event.label, event.types.len());
                println!("{}", render(&event.types, format)?);
            }
            Ok(())
        }

        Commands::Names {
            path,
            language,
            call,
        } => {
            let build = compile_plan(&config, path)?;
            let languages = match language {
                Some(l) => vec![l],
                None => build.languages().to_vec(),
            };
            let call = AnalyticsCall::from_method(&call);

            for language in languages {
                let mut client = build.client(language);
                println!("## {}", language);
                for event in build.events() {
                    print_event_names(&mut client, event, &call);
                }
                let stats = client.namer().stats();
                println!(
                    "{} identifiers in {} scopes, {} disambiguated",
                    stats.names, stats.scopes, stats.disambiguated
                );
                println!();
            }
            Ok(())
        }
    }
}

fn print_event_names(
    client: &mut typer_schema::GeneratorClient<'_>,
    event: &CompiledEvent,
    call: &AnalyticsCall,
) {
    let label = event.label.as_str();
    let type_name = client.type_name(label, &[label]);
    let function_name = client.function_name(label, &[label]);
    println!("{} -> type {}, {} {}()", event.label, type_name, call.as_str(), function_name);

    for decl in client.property_declarations(&type_name, call.payload(event)) {
        let marker = if decl.is_required { "" } else { "?" };
        println!(
            "  {}{} -> {}: {}",
            decl.source_name,
            marker,
            decl.name,
            describe(&decl.field_type)
        );
    }

    for (id, schema) in event.types.iter() {
        let name = client.custom_type_name(id);
        println!("  $defs/{} -> {} ({})", id, name, schema.kind_label());
    }
}

fn describe(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Custom(name) => name.clone(),
        FieldType::Scalar(kind) => kind.as_str().to_string(),
        FieldType::Array(items) => format!("{}[]", describe(items)),
        FieldType::InlineObject => "object".to_string(),
        FieldType::Union(members) => members
            .iter()
            .map(describe)
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// Compile every event schema at `path` (file or directory) into one build.
fn compile_plan(config: &TyperConfig, path: Option<PathBuf>) -> anyhow::Result<Build> {
    let root = match path {
        Some(path) => path,
        None => config
            .plan_path()
            .context("resolving [plan] path")?
            .context("no tracking plan given; pass a path or set [plan] path")?,
    };

    let mut build = Build::from_config(config);
    for file in collect_json_files(&root)? {
        let content = fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        let raw: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse JSON in {}: {}", file.display(), e))?;
        let stem = file.file_stem().map(|s| s.to_string_lossy().into_owned());
        build
            .add_event(&raw, stem.as_deref())
            .with_context(|| format!("compiling {}", file.display()))?;
    }
    Ok(build)
}

fn collect_json_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        anyhow::bail!("{} does not exist", root.display());
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    })
}
