use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use reformer_common::Year;
use reformer_expand::{AssemblerConfig, FormInput, JsonReformFile, ReformAssembler};
use reformer_results::{CsvExportOptions, ResultBundle, ResultsShaper, Taxonomy, export_csv, legacy};
use reformer_schema::{DataSource, LoadOptions, ParameterSet, read_snapshot, schema_json};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "reformer",
    version,
    about = "Expand tax reforms and shape simulation results"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand a form submission or reform file into complete engine input.
    Expand(ExpandArgs),
    /// Shape simulation results into tables (JSON) or the CSV download.
    Tables(TablesArgs),
    /// Validate a parameter schema snapshot.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct ExpandArgs {
    /// Parameter schema snapshot (.json, .yaml, or .yml).
    #[arg(long)]
    schema: PathBuf,

    /// Flat JSON object of form fields.
    #[arg(long, conflicts_with = "reform", required_unless_present = "reform")]
    fields: Option<PathBuf>,

    /// Year-keyed reform file.
    #[arg(long)]
    reform: Option<PathBuf>,

    /// Assumptions file merged into the reform file.
    #[arg(long, requires = "reform")]
    assumptions: Option<PathBuf>,

    /// First simulation year; defaults to the snapshot's first year.
    #[arg(long = "start-year")]
    start_year: Option<Year>,

    /// Microdata source the reform will run against.
    #[arg(long = "data-source", default_value = "puf")]
    data_source: DataSource,

    /// Skip schema bound checks.
    #[arg(long = "no-bounds")]
    no_bounds: bool,

    /// Write the engine JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TablesArgs {
    /// Simulation results JSON.
    #[arg(long)]
    results: PathBuf,

    /// First simulated year.
    #[arg(long = "start-year")]
    start_year: Year,

    /// Emit the CSV download layout instead of JSON tables.
    #[arg(long)]
    csv: bool,

    /// Results-page id written on the CSV link line.
    #[arg(long = "url-id", requires = "csv")]
    url_id: Option<String>,

    /// Taxonomy JSON replacing the built-in labels and formats.
    #[arg(long)]
    taxonomy: Option<PathBuf>,

    /// Write output here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Parameter schema snapshot (.json, .yaml, or .yml).
    #[arg(long, required_unless_present = "json_schema")]
    schema: Option<PathBuf>,

    /// Print the JSON Schema of the snapshot format and exit.
    #[arg(long = "json-schema")]
    json_schema: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Expand(args) => run_expand(args),
        Command::Tables(args) => run_tables(args),
        Command::Check(args) => run_check(args),
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn emit(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{}", text.trim_end());
            Ok(())
        }
    }
}

fn run_expand(args: ExpandArgs) -> Result<()> {
    let options = LoadOptions {
        first_year: args.start_year,
        data_source: args.data_source,
        ..LoadOptions::default()
    };
    let set = ParameterSet::load(&args.schema, &options)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let config = AssemblerConfig {
        check_bounds: !args.no_bounds,
        ..AssemblerConfig::default().with_data_source(args.data_source)
    };
    let assembler = ReformAssembler::with_config(&set, config);

    let reform = match (&args.fields, &args.reform) {
        (Some(fields), _) => {
            let form = FormInput::from_json_str(&read(fields)?)
                .with_context(|| format!("invalid form fields in {}", fields.display()))?;
            assembler.assemble_form(form)?
        }
        (None, Some(reform)) => {
            let assumptions = args.assumptions.as_deref().map(read).transpose()?;
            let file = JsonReformFile::from_strs(&read(reform)?, assumptions.as_deref())
                .with_context(|| format!("invalid reform file {}", reform.display()))?;
            assembler.assemble_file(&file)?
        }
        (None, None) => bail!("either --fields or --reform is required"),
    };

    for diagnostic in &reform.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    let json = serde_json::to_string_pretty(&reform.to_engine_json()?)?;
    emit(args.out.as_deref(), &json)
}

fn run_tables(args: TablesArgs) -> Result<()> {
    let taxonomy = match &args.taxonomy {
        Some(path) => Taxonomy::from_json_str(&read(path)?)
            .with_context(|| format!("invalid taxonomy {}", path.display()))?,
        None => Taxonomy::default(),
    };
    let bundle = ResultBundle::from_json_str(&read(&args.results)?)
        .with_context(|| format!("invalid results {}", args.results.display()))?;
    let bundle = legacy::upgrade(bundle);

    let text = if args.csv {
        let mut options = CsvExportOptions::default();
        options.url_id = args.url_id;
        export_csv(&bundle, &taxonomy, args.start_year, &options)?
    } else {
        let shaped = ResultsShaper::new(&taxonomy, args.start_year).shape_all(&bundle)?;
        serde_json::to_string_pretty(&shaped)?
    };
    emit(args.out.as_deref(), &text)
}

fn run_check(args: CheckArgs) -> Result<()> {
    if args.json_schema {
        println!("{}", schema_json());
        return Ok(());
    }
    let Some(path) = args.schema else {
        bail!("--schema is required");
    };
    let snapshot = read_snapshot(&path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    if let Err(err) = snapshot.validate() {
        for issue in err.issues() {
            eprintln!("error: {issue}");
        }
        bail!(
            "{} failed validation with {} issue(s)",
            path.display(),
            err.issues().len()
        );
    }
    let set = ParameterSet::from_snapshot(&snapshot, &LoadOptions::default())?;
    println!(
        "{}: ok ({} parameters, first year {})",
        path.display(),
        set.len(),
        set.first_year()
    );
    Ok(())
}
