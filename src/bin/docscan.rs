//! docscan CLI: manage the local record store of scanned documents.
//!
//! Usage:
//!   docscan import <payload.json> [--image uri] [--model id] [--db path]
//!   docscan list [--type tag] [--db path]
//!   docscan show|delete <id> [--db path]
//!   docscan search <query> [--db path]
//!   docscan edit <id> <field=value>... [--db path]

use chrono::Utc;
use clap::{Parser, Subcommand};
use docscan::{
    normalize_text, reconcile, DocumentRecord, DocumentStore, DocumentType, FieldEdit, FieldKind,
    OpenStore, RecordId, RecordPatch, SqliteStore,
};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docscan",
    version,
    about = "Local history of analyzed document scans"
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true, env = "DOCSCAN_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize an analysis payload and save it as a new record
    Import {
        /// File holding the engine's response, or `-` for stdin
        payload: PathBuf,
        /// Reference to the source image
        #[arg(long)]
        image: Option<String>,
        /// Identifier of the engine that produced the payload
        #[arg(long, default_value = "gpt-4o")]
        model: String,
    },
    /// List records, optionally filtered by type
    List {
        /// Type tag to match (substring, case-insensitive); `All` for every record
        #[arg(long = "type", default_value = "All")]
        doc_type: String,
    },
    /// Print one record as JSON
    Show {
        id: String,
    },
    /// Find records containing text anywhere
    Search {
        query: String,
    },
    /// Edit fields of a record's data
    Edit {
        id: String,
        /// Edits as `field=value`; values that parse as JSON are stored as such
        #[arg(required = true)]
        edits: Vec<String>,
    },
    /// Delete a record
    Delete {
        id: String,
    },
    /// Delete every record
    Clear {
        /// Confirm deletion of the whole collection
        #[arg(long)]
        yes: bool,
    },
    /// Show the fields a document type carries
    Fields {
        /// Document type tag, e.g. `receipt`
        tag: String,
    },
}

/// Get the default database path (~/.local/share/docscan/docscan.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("docscan").join("docscan.db")
}

fn open_store(db: Option<PathBuf>) -> Result<DocumentStore, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    let backend =
        SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(DocumentStore::new(Arc::new(backend)))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_payload(path: &Path) -> Result<String, String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("cannot read stdin: {}", e))?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path.display(), e))
}

fn parse_edit(raw: &str) -> Result<FieldEdit, String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    let value =
        serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(FieldEdit::new(field, value))
}

fn print_table(records: &[DocumentRecord]) {
    if records.is_empty() {
        println!("No documents.");
        return;
    }
    println!(
        "{:<36}  {:<14}  {:<22}  {:>5}  {:<20}",
        "ID", "TYPE", "LABEL", "CONF", "UPDATED"
    );
    println!("{}", "-".repeat(105));
    for record in records {
        println!(
            "{:<36}  {:<14}  {:<22}  {:>5.2}  {:<20}",
            record.id,
            record.document_type,
            record.data.type_label().unwrap_or(""),
            record.confidence,
            record.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn print_json(record: &DocumentRecord) -> i32 {
    match serde_json::to_string_pretty(record) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_import(
    store: &DocumentStore,
    payload: &Path,
    image: Option<String>,
    model: &str,
) -> i32 {
    let text = match read_payload(payload) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut body = match normalize_text(&text, Utc::now(), model) {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    body.image_uri = image;
    match store.create(body).await {
        Ok(record) => {
            println!("Saved {} ({})", record.document_type, record.id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_list(store: &DocumentStore, doc_type: &str) -> i32 {
    match store.filter_by_type(doc_type).await {
        Ok(records) => {
            print_table(&records);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_show(store: &DocumentStore, id: &str) -> i32 {
    match store.get_by_id(&RecordId::from(id)).await {
        Ok(Some(record)) => print_json(&record),
        Ok(None) => {
            eprintln!("Error: document '{}' not found", id);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_search(store: &DocumentStore, query: &str) -> i32 {
    match store.search(query).await {
        Ok(records) => {
            print_table(&records);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_edit(store: &DocumentStore, id: &str, raw_edits: &[String]) -> i32 {
    let edits = match raw_edits
        .iter()
        .map(|raw| parse_edit(raw))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(edits) => edits,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let id = RecordId::from(id);
    let result = store
        .modify(&id, |record| {
            RecordPatch::data(reconcile(record.document_type, &record.data, &edits))
        })
        .await;
    match result {
        Ok(Some(record)) => print_json(&record),
        Ok(None) => {
            eprintln!("Error: document '{}' not found", id);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_delete(store: &DocumentStore, id: &str) -> i32 {
    match store.delete(&RecordId::from(id)).await {
        Ok(true) => {
            println!("Deleted document '{}'", id);
            0
        }
        Ok(false) => {
            eprintln!("Error: document '{}' not found", id);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_clear(store: &DocumentStore, yes: bool) -> i32 {
    if !yes {
        eprintln!("Error: refusing to delete every document without --yes");
        return 1;
    }
    match store.clear().await {
        Ok(count) => {
            println!("Deleted {} document(s)", count);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_fields(tag: &str) -> i32 {
    let doc_type = match DocumentType::from_tag(tag) {
        Some(t) => t,
        None => {
            eprintln!("Warning: unknown type '{}', showing generic fields", tag);
            DocumentType::Generic
        }
    };
    println!("{} ({})", doc_type, doc_type.display_label());
    for field in doc_type.fields() {
        let kind = match field.kind {
            FieldKind::Scalar => "scalar".to_string(),
            FieldKind::ScalarArray => "list".to_string(),
            FieldKind::Object(sub) => format!("object {{{}}}", sub.join(", ")),
            FieldKind::ObjectArray(sub) => format!("list of {{{}}}", sub.join(", ")),
        };
        println!("  {:<16} {}", field.name, kind);
    }
    0
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Commands::Fields { tag } = &cli.command {
        std::process::exit(cmd_fields(tag));
    }

    let store = match open_store(cli.db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Import {
            payload,
            image,
            model,
        } => cmd_import(&store, &payload, image, &model).await,
        Commands::List { doc_type } => cmd_list(&store, &doc_type).await,
        Commands::Show { id } => cmd_show(&store, &id).await,
        Commands::Search { query } => cmd_search(&store, &query).await,
        Commands::Edit { id, edits } => cmd_edit(&store, &id, &edits).await,
        Commands::Delete { id } => cmd_delete(&store, &id).await,
        Commands::Clear { yes } => cmd_clear(&store, yes).await,
        Commands::Fields { .. } => 0,
    };

    if let Err(e) = store.close().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    std::process::exit(code);
}
