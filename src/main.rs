use clap::{Parser as ClapParser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vsql::Dialect;
use vsql::cli::{self, CliError, CompileOptions, CompileOutput};

#[derive(ClapParser)]
#[command(name = "vsql")]
#[command(about = "vsql - Compile typed vSQL expressions to Oracle or Postgres SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an AST JSON document and generate SQL for it
    Compile {
        /// Schema JSON file mapping field names to types
        #[arg(short, long)]
        schema: PathBuf,

        /// AST JSON file (reads from stdin if not provided)
        ast: Option<PathBuf>,

        /// Target SQL dialect
        #[arg(short, long, default_value = "oracle")]
        dialect: Dialect,

        /// Emit placeholders and a parameter list instead of inline literals
        #[arg(long)]
        bind: bool,

        /// Report as JSON, including diagnostics and the annotated tree
        #[arg(long)]
        json: bool,
    },

    /// List the builtin function namespace
    Functions,

    /// List the rules of a dialect
    Rules {
        /// Only rules of this operator (e.g. binop_add) or call name (e.g. lower)
        name: Option<String>,

        /// Target SQL dialect
        #[arg(short, long, default_value = "oracle")]
        dialect: Dialect,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            schema,
            ast,
            dialect,
            bind,
            json,
        } => run_compile(schema, ast, dialect, bind, json),
        Commands::Functions => {
            print!("{}", cli::list_functions());
            Ok(())
        }
        Commands::Rules { name, dialect } => cli::list_rules(dialect, name.as_deref()).map(|listing| print!("{}", listing)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so that generated SQL on stdout stays clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run_compile(
    schema: PathBuf,
    ast: Option<PathBuf>,
    dialect: Dialect,
    bind: bool,
    json: bool,
) -> Result<(), CliError> {
    let ast = match ast {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CompileOptions {
        schema: std::fs::read_to_string(schema)?,
        ast,
        dialect,
        bind,
        json,
    };

    match cli::execute_compile(&options)? {
        CompileOutput::Sql(fragment) => {
            println!("{}", fragment.sql);
            for (i, param) in fragment.params.iter().enumerate() {
                println!("-- {} = {}", dialect.placeholder(i + 1), param);
            }
        }
        CompileOutput::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
    }
    Ok(())
}
