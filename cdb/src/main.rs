use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "cdb")]
#[command(about = "Convert between the game's CDB format and SQLite", long_about = None)]
struct Cli {
    /// Increase log verbosity; repeat for more (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a .cdb file into a SQLite database
    Decode {
        input: PathBuf,
        output: PathBuf,
    },
    /// Encode a SQLite database back into a .cdb file
    Encode {
        input: PathBuf,
        output: PathBuf,
        /// zlib compression level, 0 (store) to 9 (best)
        #[arg(long, default_value_t = cdb_codec::compress::DEFAULT_COMPRESSION_LEVEL)]
        compression_level: u32,
    },
    /// Print a summary of a .cdb file's tables and columns
    Inspect {
        input: PathBuf,
    },
    /// Run an arbitrary SQL statement against a decoded SQLite file
    Sql {
        database: PathBuf,
        statement: String,
    },
}

fn main() -> cdb_base::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "cdb=warn",
        1 => "cdb=info",
        2 => "cdb=debug",
        _ => "cdb=trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Decode { input, output } => decode(&input, &output)?,
        Commands::Encode { input, output, compression_level } => encode(&input, &output, compression_level)?,
        Commands::Inspect { input } => inspect(&input)?,
        Commands::Sql { database, statement } => sql(&database, &statement)?,
    }

    Ok(())
}

fn decode(input: &PathBuf, output: &PathBuf) -> cdb_base::Result<()> {
    let bytes = std::fs::read(input)?;
    let db = cdb_codec::decode(&bytes)?;
    tracing::info!(tables = db.tables.len(), "decoded CDB file");

    if output.exists() {
        std::fs::remove_file(output)?;
    }
    let conn = Connection::open(output)?;
    cdb_relational::build(&conn, &db)?;
    Ok(())
}

fn encode(input: &PathBuf, output: &PathBuf, compression_level: u32) -> cdb_base::Result<()> {
    let conn = Connection::open(input)?;
    let db = cdb_relational::inspect(&conn)?;
    tracing::info!(tables = db.tables.len(), "read relational database");

    let bytes = cdb_codec::encode_compressed(&db, compression_level)?;
    std::fs::write(output, bytes)?;
    Ok(())
}

fn sql(database: &PathBuf, statement: &str) -> cdb_base::Result<()> {
    let conn = Connection::open(database)?;
    let mut stmt = conn.prepare(statement)?;
    let column_count = stmt.column_count();

    if column_count == 0 {
        let affected = stmt.execute([])?;
        println!("{affected} row(s) affected");
        return Ok(());
    }

    let column_names: Vec<String> = (0..column_count).map(|i| stmt.column_name(i).unwrap_or("?").to_string()).collect();
    println!("{}", column_names.join(" | "));

    let mut rows = stmt.query([])?;
    let mut printed = 0usize;
    while let Some(row) = rows.next()? {
        let fields: Vec<String> = (0..column_count)
            .map(|i| match row.get_ref(i) {
                Ok(rusqlite::types::ValueRef::Null) => "NULL".to_string(),
                Ok(rusqlite::types::ValueRef::Integer(v)) => v.to_string(),
                Ok(rusqlite::types::ValueRef::Real(v)) => v.to_string(),
                Ok(rusqlite::types::ValueRef::Text(b)) => String::from_utf8_lossy(b).into_owned(),
                Ok(rusqlite::types::ValueRef::Blob(b)) => format!("<{} byte blob>", b.len()),
                Err(_) => "?".to_string(),
            })
            .collect();
        println!("{}", fields.join(" | "));
        printed += 1;
    }
    tracing::info!(rows = printed, "query returned");

    Ok(())
}

fn inspect(input: &PathBuf) -> cdb_base::Result<()> {
    let bytes = std::fs::read(input)?;
    let db = cdb_codec::decode(&bytes)?;

    for table in &db.tables {
        println!("{} (id={}, rows={})", table.name, table.table_id, table.row_count());
        let mut columns = table.columns.iter().collect::<Vec<_>>();
        columns.sort_by_key(|c| c.column_index);
        for column in columns {
            println!(
                "  [{}] {} : {} ({:?})",
                column.column_index,
                column.name,
                column.data_type.sql_base_type(),
                column.data_type
            );
        }
    }

    Ok(())
}
