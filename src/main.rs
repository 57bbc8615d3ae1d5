use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::session::{self, Session};

const PROMPT: &str = ">> ";

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses a program and prints its syntax tree
    Parse {
        filename: Option<PathBuf>,

        /// Print the tree as JSON instead of s-expressions
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session
    Repl,
}

/// Reads a source file, exiting with the I/O status if that fails.
fn read_file(filename: PathBuf) -> String {
    session::read_source(&filename).unwrap_or_else(|e| {
        eprintln!("Failed to read file {:?}: {}", filename, e);
        debug!("Exiting with code {}", e.exit_code());

        std::process::exit(e.exit_code());
    })
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Prints every diagnostic and exits with the first one's status.
fn fail(errors: &[LoxError]) -> ! {
    for e in errors {
        eprintln!("{}", e);
    }

    let code = errors.first().map_or(1, LoxError::exit_code);
    debug!("Exiting with code {}", code);

    std::process::exit(code);
}

fn no_input() {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
}

fn tokenize(source: &str) {
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(rox::error::EXIT_SYNTAX);
    }
}

fn parse(source: &str, json: bool) -> Result<()> {
    let (tokens, errors) = Scanner::new(source).scan_all();
    if !errors.is_empty() {
        fail(&errors);
    }

    let statements = Parser::new(tokens)
        .parse()
        .unwrap_or_else(|errors| fail(&errors));

    if json {
        let rendered =
            serde_json::to_string_pretty(&statements).context("Failed to serialize syntax tree")?;
        println!("{}", rendered);
    } else {
        for stmt in &statements {
            println!("{}", AstPrinter::print_stmt(stmt));
        }
    }

    Ok(())
}

fn evaluate(source: &str) {
    let (tokens, errors) = Scanner::new(source).scan_all();
    if !errors.is_empty() {
        fail(&errors);
    }

    let expr = Parser::new(tokens)
        .parse_expression()
        .unwrap_or_else(|e| fail(&[e]));

    let mut interpreter = Interpreter::new();
    match interpreter.evaluate_expression(&expr) {
        Ok(value) => println!("{}", value),
        Err(e) => fail(&[e]),
    }
}

fn run(source: &str) {
    info!("Provided input:\n {}", source);

    let mut session = Session::stdout();
    if let Err(errors) = session.run(source) {
        fail(&errors);
    }

    info!("Program executed successfully");
}

fn repl() -> Result<()> {
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    let mut session = Session::stdout();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == ":quit" {
                    break;
                }

                let _ = editor.add_history_entry(trimmed);

                // Functions declared on this line may be called from later
                // ones, so the text has to outlive the session.
                let source: &'static str = Box::leak(line.into_boxed_str());

                if let Err(errors) = session.run(source) {
                    for e in errors {
                        eprintln!("{}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read line"),
        }
    }

    println!("Exiting...");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => match filename {
            Some(filename) => tokenize(&read_file(filename)),
            None => no_input(),
        },

        Commands::Parse { filename, json } => match filename {
            Some(filename) => parse(&read_file(filename), json)?,
            None => no_input(),
        },

        Commands::Evaluate { filename } => match filename {
            Some(filename) => evaluate(&read_file(filename)),
            None => no_input(),
        },

        Commands::Run { filename } => match filename {
            Some(filename) => run(&read_file(filename)),
            None => no_input(),
        },

        Commands::Repl => repl()?,
    }

    Ok(())
}
