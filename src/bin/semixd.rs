//! semixd: REST daemon for a semix knowledge base and index.
//!
//! All endpoints answer with JSON:
//!
//! - `GET  /search?q=`: concepts matching `q`
//! - `GET  /predicates?q=`: predicate concepts matching `q`
//! - `GET  /parents?url=|id=`: concepts linking to a concept
//! - `GET  /info?url=|id=`: a concept and its dictionary entries
//! - `GET  /concept?url=|id=`: a concept
//! - `GET  /get?q=&n=&s=`: execute a query, paginated
//! - `GET  /put?url=&ls=&rs=&m=&t=`: fetch and index a URL
//! - `POST /put`: index a `text/plain` body through a dump file
//! - `GET  /ctx?url=&b=&e=&n=`: context of a match
//! - `GET  /dump?url=`: raw content of a dump file
//! - `GET  /flush`: flush the index buffers
//!
//! Wrong methods are answered with 403, bad parameters with 400, unknown
//! concepts with 404 and failures with 500.
//!
//! Build and run: `cargo run --features server --bin semixd -- --config semix.toml`

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use semix::config::Config;
use semix::document::{self, Document};
use semix::graph::{Concept, ConceptJson};
use semix::index::{self, Context, DEFAULT_BUFFER_SIZE, Entry, Index};
use semix::query::Query;
use semix::resolve::Resolver;
use semix::resource::Resource;
use semix::search::Searcher;
use semix::stream::{self, Pipeline, Token};

#[derive(Parser)]
#[command(name = "semixd", version, about = "Semantic indexer REST daemon")]
struct Args {
    /// Knowledge-base configuration file.
    #[arg(long, env = "SEMIX_CONFIG", default_value = "semix.toml")]
    config: PathBuf,

    /// Index directory.
    #[arg(long, env = "SEMIX_DIR", default_value = "semix-index")]
    dir: PathBuf,

    /// Listen address.
    #[arg(long, env = "SEMIX_BIND", default_value = "127.0.0.1:6060")]
    bind: String,

    /// Buffered entries per concept before a write.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer: usize,

    /// Rebuild the knowledge base even if a cache exists.
    #[arg(long)]
    no_cache: bool,
}

// ── Server state ──────────────────────────────────────────────────────────

struct ServerState {
    resource: Resource,
    index: Index,
    dir: PathBuf,
}

type AppState = State<Arc<ServerState>>;

type ApiError = (StatusCode, String);

type ApiResult<T> = std::result::Result<(StatusCode, Json<T>), ApiError>;

fn bad_request(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn not_found(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::NOT_FOUND, e.to_string())
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(data)))
}

/// Run synchronous work (pipeline, index, HTTP fetches) off the runtime.
async fn blocking<T, F>(f: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> std::result::Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(internal)?
}

// ── Query parameters ──────────────────────────────────────────────────────

/// Decoded query parameters; keys may repeat.
struct Params(Vec<(String, String)>);

impl Params {
    fn parse(raw: Option<String>) -> Self {
        let decode = |s: &str| percent_decode_str(&s.replace('+', " ")).decode_utf8_lossy().into_owned();
        let pairs = raw
            .unwrap_or_default()
            .split('&')
            .filter(|kv| !kv.is_empty())
            .map(|kv| match kv.split_once('=') {
                Some((k, v)) => (decode(k), decode(v)),
                None => (decode(kv), String::new()),
            })
            .collect();
        Self(pairs)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn all(&self, key: &str) -> impl Iterator<Item = &str> {
        self.0.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn required(&self, key: &str) -> std::result::Result<&str, ApiError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| bad_request(format!("missing query parameter {key}")))
    }

    fn number<T: std::str::FromStr>(&self, key: &str, default: Option<T>) -> std::result::Result<T, ApiError> {
        match (self.get(key), default) {
            (Some(v), _) => v
                .parse()
                .map_err(|_| bad_request(format!("invalid query parameter {key}={v}"))),
            (None, Some(d)) => Ok(d),
            (None, None) => Err(bad_request(format!("missing query parameter {key}"))),
        }
    }

    /// The concept named by `url` or `id`.
    fn concept(&self, searcher: &Searcher<'_>) -> std::result::Result<Arc<Concept>, ApiError> {
        if let Some(url) = self.get("url") {
            return searcher.find(url).ok_or_else(|| not_found(format!("invalid url: {url}")));
        }
        let id: u32 = self.number("id", None)?;
        searcher.find_id(id).ok_or_else(|| not_found(format!("invalid id: {id}")))
    }
}

// ── Response types ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ConceptInfo {
    #[serde(rename = "Concept")]
    concept: ConceptJson,
    #[serde(rename = "Entries")]
    entries: Vec<String>,
}

#[derive(Serialize)]
struct TokenJson {
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Begin")]
    begin: usize,
    #[serde(rename = "End")]
    end: usize,
    #[serde(rename = "Concept")]
    concept: Option<ConceptJson>,
}

#[derive(Serialize)]
struct Tokens {
    #[serde(rename = "Tokens")]
    tokens: Vec<TokenJson>,
}

#[derive(Serialize)]
struct Entries {
    #[serde(rename = "Entries")]
    entries: Vec<Entry>,
    #[serde(rename = "Total")]
    total: usize,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn forbidden(method: Method) -> ApiError {
    (StatusCode::FORBIDDEN, format!("invalid request method: {method}"))
}

fn concepts_json(resource: &Resource, concepts: Vec<Arc<Concept>>) -> Vec<ConceptJson> {
    concepts.iter().map(|c| resource.graph().to_json(c)).collect()
}

async fn search(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<Vec<ConceptJson>> {
    let params = Params::parse(raw);
    let q = params.required("q")?;
    let hits = Searcher::new(&state.resource).search(q, None);
    ok(concepts_json(&state.resource, hits))
}

async fn predicates(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<Vec<ConceptJson>> {
    let params = Params::parse(raw);
    let q = params.get("q").unwrap_or_default();
    ok(concepts_json(&state.resource, Searcher::new(&state.resource).predicates(q)))
}

async fn parents(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<Vec<ConceptJson>> {
    let params = Params::parse(raw);
    let searcher = Searcher::new(&state.resource);
    let concept = params.concept(&searcher)?;
    ok(concepts_json(&state.resource, searcher.parents(concept.url())))
}

async fn info(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<ConceptInfo> {
    let params = Params::parse(raw);
    let searcher = Searcher::new(&state.resource);
    let concept = params.concept(&searcher)?;
    ok(ConceptInfo {
        concept: state.resource.graph().to_json(&concept),
        entries: searcher.dictionary_entries(concept.url()),
    })
}

async fn concept(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<ConceptJson> {
    let params = Params::parse(raw);
    let concept = params.concept(&Searcher::new(&state.resource))?;
    ok(state.resource.graph().to_json(&concept))
}

async fn get_entries(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<Entries> {
    let params = Params::parse(raw);
    let q = params.required("q")?.to_string();
    let n: usize = params.number("n", Some(usize::MAX))?;
    let s: usize = params.number("s", Some(0))?;
    blocking(move || {
        let searcher = Searcher::new(&state.resource);
        let resolve = |ident: &str| searcher.resolve_ident(ident);
        let query = Query::parse_with(&q, &resolve).map_err(|e| bad_request(format!("invalid query: {e}")))?;
        tracing::info!(%query, "executing query");
        let entries = query
            .execute(&state.index)
            .map_err(|e| internal(format!("cannot execute query {query}: {e}")))?;
        let total = entries.len();
        let entries = entries.into_iter().skip(s).take(n).collect();
        Ok(Entries { entries, total })
    })
    .await
    .and_then(ok)
}

async fn put_url(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<Tokens> {
    let params = Params::parse(raw);
    let doc = Document::http(params.required("url")?);
    put(state, params, doc).await
}

async fn put_text(State(state): AppState, RawQuery(raw): RawQuery, headers: HeaderMap, body: Bytes) -> ApiResult<Tokens> {
    let params = Params::parse(raw);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/plain");
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_string();
    let text = String::from_utf8(body.to_vec()).map_err(|e| bad_request(format!("bad document: {e}")))?;
    let pre = params.get("url").unwrap_or("post").to_string();
    let dir = state.dir.clone();
    let doc = blocking(move || {
        document::create_dump(&dir, &pre, &mime, &text).map_err(|e| bad_request(format!("bad document: {e}")))
    })
    .await?;
    put(state, params, doc).await
}

async fn put(state: Arc<ServerState>, params: Params, doc: Document) -> ApiResult<Tokens> {
    let levels = params
        .all("ls")
        .map(|l| l.parse::<u8>().map_err(|_| bad_request(format!("invalid error level {l}"))))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let memory: usize = params.number("m", Some(10))?;
    let threshold: f64 = params.number("t", Some(0.5))?;
    let resolvers = params
        .all("rs")
        .map(|name| Resolver::from_name(name, threshold, state.resource.rules()).map_err(bad_request))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let path = doc.path().to_string();
    let tokens = blocking(move || {
        let mut pipeline = Pipeline::new(&state.resource);
        for k in levels {
            pipeline = pipeline.with_fuzzy(k);
        }
        for resolver in resolvers {
            pipeline = pipeline.with_resolver(resolver, memory);
        }
        let tokens = pipeline
            .index(vec![doc], &state.index)
            .map_err(|e| internal(format!("cannot index document: {e}")))?;
        Ok(tokens.into_iter().map(|t| token_json(&state.resource, t)).collect())
    })
    .await?;
    tracing::info!(%path, "indexed document");
    Ok((StatusCode::CREATED, Json(Tokens { tokens })))
}

fn token_json(resource: &Resource, t: Token) -> TokenJson {
    TokenJson {
        concept: t.concept.as_ref().map(|c| resource.graph().to_json(c)),
        token: t.token,
        path: t.path,
        begin: t.begin,
        end: t.end,
    }
}

async fn ctx(State(state): AppState, RawQuery(raw): RawQuery) -> ApiResult<Context> {
    let params = Params::parse(raw);
    let url = params.required("url")?.to_string();
    let b: usize = params.number("b", None)?;
    let e: usize = params.number("e", None)?;
    let n: usize = params.number("n", None)?;
    if b > e {
        return Err(bad_request(format!("invalid query parameters b={b} e={e}")));
    }
    let dir = state.dir.clone();
    blocking(move || {
        let doc = if document::is_dump(&url) {
            document::open_dump(&dir, &url)
        } else {
            Document::http(url.as_str())
        };
        let t = stream::normalized(doc).map_err(|e| not_found(format!("invalid document {url}: {e}")))?;
        index::context(&url, &t.token, b, e, n).map_err(bad_request)
    })
    .await
    .and_then(ok)
}

async fn dump(State(state): AppState, RawQuery(raw): RawQuery) -> std::result::Result<impl IntoResponse, ApiError> {
    let params = Params::parse(raw);
    let name = params.required("url")?.to_string();
    let dir = state.dir.clone();
    let bytes = blocking(move || document::read_dump(&dir, &name).map_err(not_found)).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], bytes))
}

async fn flush(State(state): AppState) -> ApiResult<serde_json::Value> {
    blocking(move || state.index.flush().map_err(internal)).await?;
    ok(serde_json::json!({ "flushed": true }))
}

// ── Main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let resource = Config::read(&args.config)?.parse(!args.no_cache)?;
    let index = Index::open(&args.dir, args.buffer)?;
    let state = Arc::new(ServerState {
        resource,
        index: index.clone(),
        dir: args.dir.clone(),
    });

    tracing::info!("semixd initialized");

    let app = Router::new()
        .route("/search", get(search).fallback(forbidden))
        .route("/predicates", get(predicates).fallback(forbidden))
        .route("/parents", get(parents).fallback(forbidden))
        .route("/info", get(info).fallback(forbidden))
        .route("/concept", get(concept).fallback(forbidden))
        .route("/get", get(get_entries).fallback(forbidden))
        .route("/put", get(put_url).post(put_text).fallback(forbidden))
        .route("/ctx", get(ctx).fallback(forbidden))
        .route("/dump", get(dump).fallback(forbidden))
        .route("/flush", get(flush).fallback(forbidden))
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!("semixd listening on {}", args.bind);

    let listener = tokio::net::TcpListener::bind(&args.bind).await.into_diagnostic()?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .into_diagnostic()?;

    tracing::info!("closing index");
    tokio::task::spawn_blocking(move || index.close())
        .await
        .into_diagnostic()??;
    Ok(())
}
