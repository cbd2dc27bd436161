//! spanbind: inspect and exercise parameter binding from the command line.
//!
//! # Usage
//!
//! ```bash
//! # List connection properties resolved against a URI
//! spanbind properties 'sqlite::memory:;readonly=true'
//!
//! # Show how a statement and its bindings reach the backend
//! spanbind describe 'SELECT * FROM users WHERE id = ? AND name = ?' --bind 42,ada
//!
//! # Run a statement
//! spanbind exec 'SELECT * FROM users WHERE id = ?' --bind 42 --database-url sqlite://app.db
//!
//! # Apply a DDL script as one batch
//! spanbind apply schema.sql --database-url sqlite://app.db
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use spanbind::config::{CliConfig, OutputFormat};
use spanbind::prelude::*;
use spanbind::properties::driver_property_infos;
use spanbind::{batch, sql};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spanbind")]
#[command(version)]
#[command(about = "Positional parameter binding for named-parameter SQL backends", long_about = None)]
#[command(after_help = "EXAMPLES:
    spanbind properties 'sqlite::memory:;readonly=true'
    spanbind describe 'SELECT * FROM t WHERE a = ? AND b = ?' --bind 1,x
    spanbind apply schema.sql --database-url sqlite://app.db")]
struct Cli {
    /// Connection URI; properties follow the backend URL as `;name=value`
    #[arg(long, global = true, env = "SPANBIND_DATABASE_URL")]
    database_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connection properties and their resolved values
    Properties {
        /// URI to resolve against (defaults to --database-url)
        uri: Option<String>,
    },
    /// Print the statements of a script
    Split {
        file: String,
    },
    /// Show the translated SQL, parameter metadata and rendered parameters
    Describe {
        sql: String,
        /// Parameter values for ?1, ?2, ... (`null`, numbers, `true`/`false`, text)
        #[arg(short, long, value_delimiter = ',')]
        bind: Vec<String>,
    },
    /// Execute a statement
    Exec {
        sql: String,
        #[arg(short, long, value_delimiter = ',')]
        bind: Vec<String>,
    },
    /// Apply a DDL script as one batch
    Apply {
        file: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match CliConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let directive = config.log.as_deref().unwrap_or("spanbind=info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, config).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CliConfig) -> Result<()> {
    let format = cli.format.or(config.format).unwrap_or_default();
    let database_url = cli.database_url.or(config.database_url);

    match cli.command {
        Commands::Properties { uri } => {
            let uri = uri.or(database_url).unwrap_or_default();
            show_properties(&uri, format)
        }
        Commands::Split { file } => {
            let statements = batch::read_script(&file).with_context(|| format!("reading {}", file))?;
            show_statements(&statements, format)
        }
        Commands::Describe { sql, bind } => describe(&sql, &bind, format),
        Commands::Exec { sql, bind } => {
            let uri = require_url(database_url)?;
            exec(&uri, &sql, &bind, format).await
        }
        Commands::Apply { file } => {
            let uri = require_url(database_url)?;
            let script = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file))?;
            let conn = Connection::connect(&uri).await?;
            let applied = conn.execute_script(&script).await?;
            println!("{} {} statement(s) applied", "✓".green(), applied);
            Ok(())
        }
    }
}

fn require_url(url: Option<String>) -> Result<String> {
    match url {
        Some(url) => Ok(url),
        None => bail!("no database URL. Use --database-url or set SPANBIND_DATABASE_URL"),
    }
}

/// Interpret a command line value: `null`, integers, floats, booleans, else text.
fn parse_bind(raw: &str) -> Parameter {
    if raw.eq_ignore_ascii_case("null") {
        Parameter::Null
    } else if let Ok(n) = raw.parse::<i64>() {
        Parameter::Long(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        Parameter::Double(f)
    } else if raw == "true" || raw == "false" {
        Parameter::Bool(raw == "true")
    } else {
        Parameter::String(raw.to_string())
    }
}

fn show_properties(uri: &str, format: OutputFormat) -> Result<()> {
    let infos = driver_property_infos(uri);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&infos)?),
        OutputFormat::Table => {
            let width = infos.iter().map(|i| i.name.len()).max().unwrap_or(0);
            for info in &infos {
                let value = info.value.as_deref().unwrap_or("-");
                let choices = info
                    .choices
                    .as_ref()
                    .map(|c| format!(" [{}]", c.join("|")))
                    .unwrap_or_default();
                println!(
                    "{:width$}  {}{}",
                    info.name.cyan(),
                    value.yellow(),
                    choices.dimmed(),
                    width = width
                );
                println!("{:width$}  {}", "", info.description.dimmed(), width = width);
            }
        }
    }
    Ok(())
}

fn show_statements(statements: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(statements)?),
        OutputFormat::Table => {
            for (i, statement) in statements.iter().enumerate() {
                println!("{} {}", format!("{:>3}.", i + 1).dimmed(), statement.white());
            }
        }
    }
    Ok(())
}

fn describe(statement: &str, bind: &[String], format: OutputFormat) -> Result<()> {
    let mut store = ParameterStore::new();
    for (i, raw) in bind.iter().enumerate() {
        store.set(i + 1, parse_bind(raw))?;
    }
    let translated = sql::to_named_parameters(statement);
    let metadata = store.describe()?;
    let rendered = store.render()?;
    let placeholders = sql::count_placeholders(statement);

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "sql": translated,
                "placeholders": placeholders,
                "metadata": metadata,
                "parameters": rendered,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            println!("{}", "Translated SQL:".green().bold());
            println!("  {}", translated.white());
            println!();
            println!(
                "{} {} placeholder(s), {} bound",
                "Parameters:".cyan().bold(),
                placeholders,
                metadata.parameter_count()
            );
            for (position, info) in metadata.iter() {
                let name = NamedParameters::name_for(position);
                let class = info.and_then(|i| i.class_name).unwrap_or("-");
                let value = rendered
                    .get(&name)
                    .map(|v| {
                        let ty = v.ty.as_ref().map(|t| t.to_string()).unwrap_or_else(|| "?".into());
                        format!("{} {}", ty, v.value)
                    })
                    .unwrap_or_default();
                println!("  @{:6} {:12} {}", name.yellow(), class.white(), value.dimmed());
            }
            if placeholders != metadata.parameter_count() {
                println!();
                println!(
                    "{}",
                    "⚠ Number of bindings differs from number of placeholders".yellow()
                );
            }
        }
    }
    Ok(())
}

async fn exec(uri: &str, statement: &str, bind: &[String], format: OutputFormat) -> Result<()> {
    let conn = Connection::connect(uri).await?;
    let mut stmt = conn.prepare(statement);
    for (i, raw) in bind.iter().enumerate() {
        stmt.set_object(i + 1, parse_bind(raw))?;
    }

    if !sql::is_query(statement) {
        let affected = stmt.execute_update().await?;
        println!("{} {} rows affected", "✓".green(), affected);
        return Ok(());
    }

    let rows = stmt.execute_query().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => print_table(&rows),
    }
    Ok(())
}

fn print_table(rows: &ResultSet) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    let columns = rows.columns();
    let cells: Vec<Vec<String>> = rows
        .rows()
        .iter()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row.get(i).map_or(0, String::len))
                .max()
                .unwrap_or(0)
                .max(c.name.len())
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c.name, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());
    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:width$}", v, width = *w))
            .collect();
        println!("{}", line.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", rows.len().to_string().cyan());
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
