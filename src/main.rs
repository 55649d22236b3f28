use std::fs;
use std::path::PathBuf;

use clap::Args as ClapArgs;
use clap::Parser;
use clap::Subcommand;
use formulas::Binding;
use formulas::Bindings;
use formulas::Formula;
use formulas::Lexer;
use miette::IntoDiagnostic;
use miette::WrapErr;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Check and evaluate infix formulas")]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print every token of the formula, one per line.
    Tokenize {
        #[command(flatten)]
        input: Input,
    },
    /// Validate the formula and print it normalized.
    Check {
        #[command(flatten)]
        input: Input,
    },
    /// Evaluate the formula.
    Eval {
        #[command(flatten)]
        input: Input,

        /// Bind a variable, e.g. `--var x=3`. Overrides `--vars`.
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<Binding>,

        /// File of `name = value` lines.
        #[arg(long = "vars", value_name = "FILE")]
        vars_file: Option<PathBuf>,
    },
}

#[derive(Debug, ClapArgs)]
struct Input {
    /// Formula text.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    formula: Option<String>,

    /// Read the formula from a file instead.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl Input {
    fn read(self) -> miette::Result<String> {
        match (self.formula, self.file) {
            (Some(formula), _) => Ok(formula),
            (None, Some(filename)) => fs::read_to_string(&filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading `{}` failed", filename.display())),
            (None, None) => Err(miette::miette!("no formula given")),
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_or_exit(source: &str) -> Formula {
    match Formula::parse(source) {
        Ok(formula) => formula,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(65);
        }
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Tokenize { input } => {
            let source = input.read()?;
            for token in Lexer::new(&source) {
                println!("{token}");
            }
            println!("EOF  null");
        }
        Commands::Check { input } => {
            let source = input.read()?;
            let formula = parse_or_exit(&source);
            println!("{formula}");
            let variables = formula.variables();
            if !variables.is_empty() {
                println!("variables: {}", variables.join(", "));
            }
        }
        Commands::Eval {
            input,
            vars,
            vars_file,
        } => {
            let source = input.read()?;
            let formula = parse_or_exit(&source);

            let mut bindings = match vars_file {
                Some(filename) => {
                    let text = fs::read_to_string(&filename)
                        .into_diagnostic()
                        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;
                    Bindings::parse(&text)
                        .wrap_err_with(|| format!("invalid bindings in `{}`", filename.display()))?
                }
                None => Bindings::new(),
            };
            bindings.extend(vars);
            tracing::info!(variables = bindings.len(), "loaded bindings");

            match formula.evaluate(&|name: &str| bindings.lookup(name)) {
                Ok(value) => println!("{value}"),
                Err(e) => {
                    eprintln!("{:?}", miette::Report::new(e));
                    std::process::exit(70);
                }
            }
        }
    }
    Ok(())
}
