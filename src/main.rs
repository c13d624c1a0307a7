//! markupgen - compile UI markup documents to C# construction code

use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use markupgen::{
    CompileOptions, CompilerError, ConverterRegistry, IncrementalCache, MarkupCompiler,
    ModuleCache, ObjectModel, SchemaLoader,
};

#[derive(Parser)]
#[command(name = "markupgen")]
#[command(about = "Compile UI markup documents to C# construction code", long_about = None)]
#[command(version)]
struct Cli {
    /// Markup files to compile (class name defaults to the file stem)
    #[arg(short = 'f', long = "file")]
    files: Vec<PathBuf>,

    /// Markup text to compile instead of files
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Class name for the generated code
    #[arg(short = 'c', long = "class-name")]
    class_name: Option<String>,

    /// Namespace for the generated code
    #[arg(short = 'n', long, default_value = "Generated")]
    namespace: String,

    /// Schema files, separated by ';'
    #[arg(short = 'r', long)]
    references: Option<String>,

    /// File listing one schema path per line
    #[arg(long = "reference-files")]
    reference_files: Option<PathBuf>,

    /// Directory searched recursively for *.schema.json files
    #[arg(long = "reference-dir")]
    reference_dir: Option<PathBuf>,

    /// Output file, or directory when compiling several files
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Reuse outputs of unchanged files from this directory
    #[arg(long = "cache-dir")]
    cache_dir: Option<PathBuf>,

    /// JSON file overriding the target object model
    #[arg(long = "object-model")]
    object_model: Option<PathBuf>,

    /// Print failures as JSON diagnostics
    #[arg(long = "json-errors")]
    json_errors: bool,
}

struct Job {
    source_path: Option<PathBuf>,
    source: String,
    options: CompileOptions,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("markupgen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` when at least one document failed to compile.
fn run(cli: &Cli) -> Result<bool> {
    let model = match &cli.object_model {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading object model {}", path.display()))?;
            ObjectModel::from_json(&json)
                .with_context(|| format!("parsing object model {}", path.display()))?
        }
        None => ObjectModel::default(),
    };

    register_schemas(cli)?;
    let jobs = collect_jobs(cli)?;
    if jobs.is_empty() {
        bail!("nothing to compile: pass --file or --input");
    }

    let modules = ModuleCache::global();
    let converters = Arc::new(ConverterRegistry::with_defaults(&model));
    let cache = cli.cache_dir.as_ref().map(IncrementalCache::new);
    let multiple = jobs.len() > 1;

    let results: Vec<bool> = jobs
        .par_iter()
        .map(|job| {
            let mut compiler =
                MarkupCompiler::with_converters(modules.clone(), model.clone(), converters.clone());
            compile_job(cli, job, &mut compiler, cache.as_ref(), &modules, multiple)
        })
        .collect();

    Ok(results.into_iter().all(|ok| ok))
}

fn register_schemas(cli: &Cli) -> Result<()> {
    let loader = SchemaLoader::global();

    if let Some(references) = &cli.references {
        for path in references.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            if loader.register_path(path).is_none() {
                bail!("cannot derive a module name from '{}'", path);
            }
        }
    }
    if let Some(list) = &cli.reference_files {
        loader
            .register_reference_file(list)
            .with_context(|| format!("reading reference list {}", list.display()))?;
    }
    if let Some(dir) = &cli.reference_dir {
        loader.discover(dir);
    }
    Ok(())
}

fn collect_jobs(cli: &Cli) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();

    if let Some(input) = &cli.input {
        let class_name = cli
            .class_name
            .clone()
            .context("--class-name is required with --input")?;
        jobs.push(Job {
            source_path: None,
            source: input.clone(),
            options: CompileOptions::new(class_name, &cli.namespace),
        });
    }

    for path in &cli.files {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading markup {}", path.display()))?;
        let class_name = match &cli.class_name {
            Some(name) if cli.files.len() == 1 => name.clone(),
            _ => file_stem(path)?,
        };
        jobs.push(Job {
            source_path: Some(path.clone()),
            source,
            options: CompileOptions::new(class_name, &cli.namespace),
        });
    }

    check_class_names(&jobs)?;
    Ok(jobs)
}

/// Each job writes `<Class>.g.cs` and declares `partial class <Class>`, so
/// class names must be unique across one run.
fn check_class_names(jobs: &[Job]) -> Result<()> {
    let mut seen: HashMap<&str, String> = HashMap::new();
    for job in jobs {
        let origin = job
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "--input".to_string());
        if let Some(first) = seen.insert(&job.options.class_name, origin.clone()) {
            bail!(
                "class name '{}' is produced by both {} and {}",
                job.options.class_name,
                first,
                origin
            );
        }
    }
    Ok(())
}

fn compile_job(
    cli: &Cli,
    job: &Job,
    compiler: &mut MarkupCompiler,
    cache: Option<&IncrementalCache>,
    modules: &ModuleCache,
    multiple: bool,
) -> bool {
    let key = job
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("<input>:{}", job.options.class_name));

    let model = compiler.model().clone();
    let cached = cache.and_then(|c| c.get(&key, &job.source, &job.options, &model, modules));
    let output = match cached {
        Some(output) => output,
        None => match compiler.compile(&job.source, &job.options) {
            Ok(output) => {
                if let Some(cache) = cache {
                    cache.set(&key, &job.source, &job.options, &model, &output);
                }
                output
            }
            Err(err) => {
                report(cli, &key, &err);
                return false;
            }
        },
    };

    match write_output(cli, job, &output.code, multiple) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(file = %key, "{:#}", err);
            false
        }
    }
}

fn report(cli: &Cli, key: &str, err: &CompilerError) {
    if cli.json_errors {
        match serde_json::to_string(&err.to_diagnostic()) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}: {}", key, err),
        }
    } else {
        eprintln!("{}: {}", key, err);
    }
}

fn write_output(cli: &Cli, job: &Job, code: &str, multiple: bool) -> Result<()> {
    let Some(output) = &cli.output else {
        print!("{}", code);
        return Ok(());
    };

    let target = if multiple || output.is_dir() {
        fs::create_dir_all(output)
            .with_context(|| format!("creating output directory {}", output.display()))?;
        output.join(format!("{}.g.cs", job.options.class_name))
    } else {
        output.clone()
    };

    fs::write(&target, code).with_context(|| format!("writing {}", target.display()))?;
    tracing::info!(path = %target.display(), "wrote generated code");
    Ok(())
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a class name from {}", path.display()))
}
