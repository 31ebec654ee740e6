use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docsearch::persist::{load_index, load_meta, save_index, IndexPaths};
use docsearch::{IndexBuilder, Scorer, SearchOptions, SourceDocument, Stemming};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query static documentation search indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Stemming algorithm: porter (Sphinx compatible) or snowball
        #[arg(long, default_value = "porter")]
        stemmer: Stemming,
    },
    /// Run a query against a built index and print the hits as JSON
    Query {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Maximum number of hits to print
        #[arg(long)]
        limit: Option<usize>,
        /// Also match terms that merely contain a query word
        #[arg(long, default_value_t = false)]
        partial: bool,
        /// JSON file overriding the default ranking weights
        #[arg(long)]
        scorer: Option<PathBuf>,
        /// Query words
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Load an index, check its consistency and print table sizes
    Inspect {
        #[arg(long, default_value = "./index")]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stemmer } => build_index(&input, &output, stemmer),
        Commands::Query { index, limit, partial, scorer, query } => {
            run_query(&index, &query.join(" "), limit, partial, scorer.as_deref())
        }
        Commands::Inspect { index } => inspect(&index),
    }
}

fn build_index(input: &str, output: &str, stemming: Stemming) -> Result<()> {
    let files = collect_inputs(Path::new(input))?;
    if files.is_empty() {
        bail!("no .json or .jsonl files found under {input}");
    }

    let mut builder = IndexBuilder::new();
    builder.stemming(stemming);
    for file in files {
        let docs = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        tracing::debug!(file = %file.display(), docs = docs.len(), "read corpus file");
        builder.extend(docs);
    }
    tracing::info!(num_docs = builder.len(), "ingested documents");

    let index = builder.build()?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    save_index(&IndexPaths::new(output), &index, &created_at)
        .with_context(|| format!("writing index to {output}"))?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn collect_inputs(input_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name() {
            let entry = entry?;
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input {} does not exist", input_path.display());
    }
    Ok(files)
}

fn read_jsonl(file: &Path) -> Result<Vec<SourceDocument>> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    let mut docs = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: SourceDocument = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<SourceDocument>> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<SourceDocument>, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => bail!("{} holds neither a document nor an array of documents", file.display()),
    };
    Ok(docs)
}

fn run_query(index_dir: &str, query: &str, limit: Option<usize>, partial: bool, scorer: Option<&Path>) -> Result<()> {
    let index = load_index(&IndexPaths::new(index_dir))?;
    let scorer = match scorer {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader::<_, Scorer>(BufReader::new(f))?
        }
        None => Scorer::default(),
    };
    let options = SearchOptions { scorer, partial_matches: partial, limit };
    let hits = index.search_with(query, &options);
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "query": query,
        "total_hits": hits.len(),
        "results": hits,
    }))?);
    Ok(())
}

fn inspect(index_dir: &str) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let index = load_index(&paths)?;
    let created_at = load_meta(&paths).map(|m| m.created_at).ok();
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "num_docs": index.num_docs(),
        "num_terms": index.num_terms(),
        "title_terms": index.title_terms().len(),
        "body_terms": index.body_terms().len(),
        "objects": index.objects().len(),
        "stemming": index.stemming(),
        "created_at": created_at,
    }))?);
    Ok(())
}
