//! oxide-d1-migrate CLI
//!
//! Command-line tool for recreating SQLite tables with an edited schema.

use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_d1_migrate::prelude::*;

/// Table-recreating schema migrations.
#[derive(Parser)]
#[command(name = "oxide-d1-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Show SQL without executing (dry run).
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a table's parsed schema.
    Describe {
        /// Table name.
        #[arg(short, long)]
        table: String,
    },

    /// Drop a column.
    DropColumn {
        /// Table name.
        #[arg(short, long)]
        table: String,
        /// Column to drop.
        #[arg(short, long)]
        column: String,
    },

    /// Add a column.
    AddColumn {
        /// Table name.
        #[arg(short, long)]
        table: String,
        /// Column name.
        #[arg(short, long)]
        column: String,
        /// Type and constraints, e.g. "TEXT NOT NULL DEFAULT ''".
        #[arg(short, long)]
        definition: String,
    },

    /// Replace a column's type and constraints.
    AlterColumn {
        /// Table name.
        #[arg(short, long)]
        table: String,
        /// Column name.
        #[arg(short, long)]
        column: String,
        /// New type and constraints.
        #[arg(short, long)]
        definition: String,
    },

    /// Add a named table constraint.
    AddConstraint {
        /// Table name.
        #[arg(short, long)]
        table: String,
        /// Constraint name.
        #[arg(short, long)]
        name: String,
        /// Constraint clause, e.g. "UNIQUE (email)".
        #[arg(short, long)]
        clause: String,
    },

    /// Drop a named table constraint.
    DropConstraint {
        /// Table name.
        #[arg(short, long)]
        table: String,
        /// Constraint name.
        #[arg(short, long)]
        name: String,
    },

    /// Replace a named constraint's clause.
    AlterConstraint {
        /// Table name.
        #[arg(short, long)]
        table: String,
        /// Constraint name.
        #[arg(short, long)]
        name: String,
        /// New clause.
        #[arg(short, long)]
        clause: String,
    },

    /// Rename a named table constraint.
    RenameConstraint {
        /// Table name.
        #[arg(short, long)]
        table: String,
        /// Current name.
        #[arg(short, long)]
        from: String,
        /// New name.
        #[arg(long)]
        to: String,
    },
}

fn print_document(document: &DdlDocument) {
    println!("table {}", document.table_name());
    for column in document.column_defs() {
        println!("  column     {} {}", column.name, column.type_clause);
    }
    for constraint in document.constraints() {
        let name = constraint.name.as_deref().unwrap_or("-");
        println!("  constraint {} {}", name, constraint.clause);
    }
    if !document.trailing_options().is_empty() {
        println!("  options    {}", document.trailing_options());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Connect to database
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&cli.database)
        .await?;

    let executor = RecreateExecutor::new(SqliteBackend::new(pool)).dry_run(cli.dry_run);

    if cli.dry_run {
        info!("Dry run mode - SQL will be printed but not executed.");
    }

    let plan = match cli.command {
        Commands::Describe { table } => {
            print_document(&executor.describe(&table).await?);
            return Ok(());
        }
        Commands::DropColumn { table, column } => executor.drop_column(&table, &column).await?,
        Commands::AddColumn {
            table,
            column,
            definition,
        } => {
            executor
                .add_column(&table, ColumnDef::new(column, definition))
                .await?
        }
        Commands::AlterColumn {
            table,
            column,
            definition,
        } => {
            executor
                .alter_column(&table, &column, &definition, vec![])
                .await?
        }
        Commands::AddConstraint {
            table,
            name,
            clause,
        } => {
            executor
                .add_constraint(&table, ConstraintDef::named(name, clause))
                .await?
        }
        Commands::DropConstraint { table, name } => {
            executor.drop_constraint(&table, &name).await?
        }
        Commands::AlterConstraint {
            table,
            name,
            clause,
        } => {
            executor
                .alter_constraint(&table, &name, &clause, vec![])
                .await?
        }
        Commands::RenameConstraint { table, from, to } => {
            executor.rename_constraint(&table, &from, &to).await?
        }
    };

    info!(
        table = %plan.source_table,
        columns = %plan.preserved_columns.join(", "),
        "Done"
    );
    Ok(())
}
