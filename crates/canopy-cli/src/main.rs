use std::path::{Path, PathBuf};
use std::process;

use canopy_core::chart::Chart;
use canopy_core::{
    grammar, parse, parse_sentence, split_words, symbols, Error, Grammar, ParseLimits, TagLattice,
    TreeNode,
};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

const EXIT_OK: i32 = 0;
const EXIT_NO_PARSE: i32 = 1;
const EXIT_ERROR: i32 = 2;

/// Canopy - context-free chart parsing with full forest enumeration
///
/// Check and format grammars, parse category sequences, and parse
/// tagged sentences into every possible tree.
#[derive(Parser)]
#[command(name = "canopy", version, about, long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print nothing to stdout; rely on the exit code
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GrammarArg {
    /// Grammar file (.json or text); defaults to the built-in English grammar
    #[arg(short, long)]
    grammar: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a grammar and report its size
    Check {
        #[command(flatten)]
        grammar: GrammarArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a grammar in canonical text form
    Fmt {
        #[command(flatten)]
        grammar: GrammarArg,
    },

    /// Compute the grammar fingerprint (SHA-256)
    Hash {
        #[command(flatten)]
        grammar: GrammarArg,
    },

    /// Parse a sequence of categories and print every tree
    Parse {
        #[command(flatten)]
        grammar: GrammarArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Draw trees (or indent JSON)
        #[arg(long)]
        pretty: bool,
        /// Input symbols, e.g. `N V Det N`
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Dump the chart built for a sequence of categories
    Chart {
        #[command(flatten)]
        grammar: GrammarArg,
        /// Input symbols
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Parse a sentence from per-word tag guesses
    Sentence {
        #[command(flatten)]
        grammar: GrammarArg,
        /// Tag guesses as JSON, or `@FILE` to read them from a file
        #[arg(long)]
        tags: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Draw trees (or indent JSON)
        #[arg(long)]
        pretty: bool,
        /// Longest sentence accepted, in words
        #[arg(long)]
        max_words: Option<usize>,
        /// Most tag combinations tried
        #[arg(long)]
        max_combinations: Option<usize>,
        /// Most trees returned
        #[arg(long)]
        max_trees: Option<usize>,
        /// The sentence, as one quoted argument or several words
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match run(cli.command, cli.quiet) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            EXIT_ERROR
        }
    };

    process::exit(exit_code);
}

fn run(command: Commands, quiet: bool) -> canopy_core::Result<i32> {
    match command {
        Commands::Check { grammar, json } => cmd_check(grammar.path(), json, quiet),
        Commands::Fmt { grammar } => {
            let grammar = load_grammar(grammar.path())?;
            if !quiet {
                print!("{}", grammar.to_text());
            }
            Ok(EXIT_OK)
        }
        Commands::Hash { grammar } => {
            let grammar = load_grammar(grammar.path())?;
            if !quiet {
                println!("{}", grammar.fingerprint());
            }
            Ok(EXIT_OK)
        }
        Commands::Parse {
            grammar,
            json,
            pretty,
            symbols: input,
        } => {
            let grammar = load_grammar(grammar.path())?;
            let trees = parse(&grammar, &symbols(input));
            report_trees(&trees, json, pretty, quiet)
        }
        Commands::Chart {
            grammar,
            symbols: input,
        } => {
            let grammar = load_grammar(grammar.path())?;
            let chart = Chart::build(&grammar, &symbols(input));
            let accepted = chart.is_accepted(&grammar);
            if !quiet {
                print!("{}", chart.display(&grammar));
                println!("accepted: {}", if accepted { "yes" } else { "no" });
            }
            Ok(if accepted { EXIT_OK } else { EXIT_NO_PARSE })
        }
        Commands::Sentence {
            grammar,
            tags,
            json,
            pretty,
            max_words,
            max_combinations,
            max_trees,
            words,
        } => {
            let grammar = load_grammar(grammar.path())?;
            let lattice = TagLattice::from_json(&read_tags(&tags)?)?;

            let defaults = ParseLimits::default();
            let limits = ParseLimits {
                max_words: max_words.unwrap_or(defaults.max_words),
                max_combinations: max_combinations.unwrap_or(defaults.max_combinations),
                max_trees: max_trees.unwrap_or(defaults.max_trees),
            };

            let sentence = words.join(" ");
            let trees = parse_sentence(&grammar, &split_words(&sentence), &lattice, &limits)?;
            report_trees(&trees, json, pretty, quiet)
        }
        Commands::Version => {
            println!(
                "canopy {} (canopy-core {})",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_VERSION")
            );
            Ok(EXIT_OK)
        }
    }
}

impl GrammarArg {
    fn path(&self) -> Option<&Path> {
        self.grammar.as_deref()
    }
}

fn load_grammar(path: Option<&Path>) -> canopy_core::Result<Grammar> {
    match path {
        Some(path) => {
            log::info!("loading grammar from {}", path.display());
            grammar::load(path)
        }
        None => Ok(Grammar::english()),
    }
}

fn read_tags(tags: &str) -> canopy_core::Result<String> {
    match tags.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| Error::InputError(format!("cannot read tags {}: {}", path, e))),
        None => Ok(tags.to_string()),
    }
}

fn cmd_check(path: Option<&Path>, json: bool, quiet: bool) -> canopy_core::Result<i32> {
    let grammar = match load_grammar(path) {
        Ok(grammar) => grammar,
        Err(e) if json && !quiet => {
            let report = serde_json::json!({
                "valid": false,
                "error": e.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(EXIT_ERROR);
        }
        Err(e) => return Err(e),
    };

    if quiet {
        return Ok(EXIT_OK);
    }

    let summary = grammar.summary();
    if json {
        let mut report = serde_json::to_value(&summary)?;
        report["valid"] = serde_json::Value::Bool(true);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} grammar is valid: {} rules, {} terminals, {} non-terminals (start `{}`)",
            "✓".green().bold(),
            summary.rules,
            summary.terminals,
            summary.nonterminals,
            summary.start
        );
    }
    Ok(EXIT_OK)
}

fn report_trees(
    trees: &[TreeNode],
    json: bool,
    pretty: bool,
    quiet: bool,
) -> canopy_core::Result<i32> {
    let code = if trees.is_empty() { EXIT_NO_PARSE } else { EXIT_OK };
    if quiet {
        return Ok(code);
    }

    if json {
        let out = if pretty {
            serde_json::to_string_pretty(trees)?
        } else {
            serde_json::to_string(trees)?
        };
        println!("{}", out);
        return Ok(code);
    }

    if trees.is_empty() {
        eprintln!("{} no parse", "✗".red().bold());
        return Ok(code);
    }

    for (i, tree) in trees.iter().enumerate() {
        if pretty {
            println!("{} {}", format!("#{}", i + 1).bold(), "─".repeat(30).dimmed());
            print!("{}", tree.pretty());
        } else {
            println!("{}", tree);
        }
    }
    eprintln!("{} {} tree(s)", "✓".green().bold(), trees.len());
    Ok(code)
}

// ── Logging ───────────────────────────────────────────────

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow().bold(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("{} {}", tag, record.args());
    }

    fn flush(&self) {}
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
