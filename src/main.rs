//! semix CLI: build knowledge bases, index documents and query the index.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use semix::config::Config;
use semix::document::Document;
use semix::graph::dot;
use semix::index::{self, DEFAULT_BUFFER_SIZE, Index};
use semix::query::Query;
use semix::resolve::Resolver;
use semix::resource::Resource;
use semix::search::Searcher;
use semix::stream::{self, Pipeline};

#[derive(Parser)]
#[command(name = "semix", version, about = "Semantic indexer")]
struct Cli {
    /// Knowledge-base configuration file.
    #[arg(long, global = true, env = "SEMIX_CONFIG", default_value = "semix.toml")]
    config: PathBuf,

    /// Index directory.
    #[arg(long, global = true, env = "SEMIX_DIR", default_value = "semix-index")]
    dir: PathBuf,

    /// Rebuild the knowledge base even if a cache exists.
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a concept (by URL or id) with its dictionary entries.
    Info {
        concept: String,
    },

    /// Search concepts by URL, name or dictionary entry.
    Search {
        query: String,

        /// Maximal number of results.
        #[arg(short, long)]
        n: Option<usize>,
    },

    /// Print the neighbourhood of a concept as graphviz dot code.
    Dot {
        concept: String,

        #[arg(long, default_value = "LR")]
        rankdir: String,
    },

    /// Index documents (files or http(s) URLs).
    Put {
        #[arg(required = true)]
        documents: Vec<String>,

        /// Error levels of additional fuzzy matching stages.
        #[arg(long = "ls", value_delimiter = ',')]
        levels: Vec<u8>,

        /// Resolvers: simple, automatic or ruled.
        #[arg(long = "rs", value_delimiter = ',')]
        resolvers: Vec<String>,

        /// Memory size of the resolvers.
        #[arg(short, default_value = "10")]
        m: usize,

        /// Threshold of the automatic resolver.
        #[arg(short, default_value = "0.5")]
        t: f64,

        /// Buffered entries per concept before a write.
        #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer: usize,
    },

    /// Execute a query against the index.
    Get {
        query: String,

        /// Maximal number of entries.
        #[arg(short, long)]
        n: Option<usize>,

        /// Number of entries to skip.
        #[arg(short, long, default_value = "0")]
        s: usize,
    },

    /// Show the context of a match in a normalised document.
    Ctx {
        document: String,

        #[arg(short)]
        b: usize,

        #[arg(short)]
        e: usize,

        #[arg(short, default_value = "20")]
        n: usize,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let load = || -> Result<Resource> { Ok(Config::read(&cli.config)?.parse(!cli.no_cache)?) };

    match &cli.command {
        Commands::Info { concept } => {
            let resource = load()?;
            let searcher = Searcher::new(&resource);
            let Some(c) = searcher.lookup(concept) else {
                miette::bail!("concept not found: {concept}");
            };
            let json = serde_json::json!({
                "Concept": resource.graph().to_json(&c),
                "Entries": searcher.dictionary_entries(c.url()),
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }

        Commands::Search { query, n } => {
            let resource = load()?;
            let hits = Searcher::new(&resource).search(query, *n);
            if hits.is_empty() {
                println!("No concepts found.");
            }
            for c in hits {
                println!("{} / {} [{}]", c.url(), c.short_name(), c.raw_id());
            }
        }

        Commands::Dot { concept, rankdir } => {
            let resource = load()?;
            let Some(c) = Searcher::new(&resource).lookup(concept) else {
                miette::bail!("concept not found: {concept}");
            };
            print!("{}", dot::render(resource.graph(), &c, rankdir));
        }

        Commands::Put {
            documents,
            levels,
            resolvers,
            m,
            t,
            buffer,
        } => {
            let resource = load()?;
            let mut pipeline = Pipeline::new(&resource);
            for k in levels {
                pipeline = pipeline.with_fuzzy(*k);
            }
            for name in resolvers {
                let resolver = Resolver::from_name(name, *t, resource.rules())?;
                pipeline = pipeline.with_resolver(resolver, *m);
            }
            let index = Index::open(&cli.dir, *buffer)?;
            let documents = documents.iter().map(|d| document(d)).collect();
            let result = pipeline.index(documents, &index);
            index.close()?;
            let tokens = result?;
            println!("Indexed {} concept tokens into {}", tokens.len(), cli.dir.display());
        }

        Commands::Get { query, n, s } => {
            let resource = load()?;
            let searcher = Searcher::new(&resource);
            let resolve = |ident: &str| searcher.resolve_ident(ident);
            let query = Query::parse_with(query, &resolve)?;
            tracing::debug!(%query, "executing query");
            let index = Index::open(&cli.dir, DEFAULT_BUFFER_SIZE)?;
            let entries = query.execute(&index)?;
            index.close()?;
            let page = entries.iter().skip(*s).take(n.unwrap_or(usize::MAX));
            for entry in page {
                println!("{}", serde_json::to_string(entry).into_diagnostic()?);
            }
        }

        Commands::Ctx { document: path, b, e, n } => {
            let t = stream::normalized(document(path))?;
            let ctx = index::context(path, &t.token, *b, *e, *n)?;
            println!("{}", serde_json::to_string_pretty(&ctx).into_diagnostic()?);
        }
    }

    Ok(())
}

/// A document argument: an http(s) URL or a local file.
fn document(arg: &str) -> Document {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        Document::http(arg)
    } else {
        Document::file(Path::new(arg))
    }
}
