mod lexer;

use anyhow::Context as _;
use clap::Parser;
use slrgen::{grammar::Grammar, lr0::ItemSetBuilder, table::Config};
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    grammar: PathBuf,

    /// The file containing the expression to parse (only its first line is read).
    #[arg(short, long, conflicts_with = "expr")]
    input: Option<PathBuf>,

    /// The expression to parse.
    #[arg(short, long)]
    expr: Option<String>,

    /// Print the loaded grammar.
    #[arg(long)]
    dump_grammar: bool,

    /// Print the canonical collection of LR(0) item sets.
    #[arg(long)]
    dump_automaton: bool,

    /// Print the ACTION/GOTO tables.
    #[arg(long)]
    dump_table: bool,

    /// Fail if the grammar is not SLR(1).
    #[arg(long)]
    deny_conflicts: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let grammar = Grammar::from_file(&args.grammar)
        .with_context(|| format!("failed to load the grammar from {}", args.grammar.display()))?;

    if args.dump_grammar {
        println!("{}", grammar);
    }

    let table = Config::new()
        .deny_conflicts(args.deny_conflicts)
        .build(&grammar)
        .context("failed to build the parse table")?;

    if args.dump_automaton {
        let lr0 = ItemSetBuilder::new(table.grammar()).canonical_collection();
        println!("{}", lr0.display(table.grammar()));
    }
    if args.dump_table {
        println!("{}", table);
    }

    let num_conflicts = table.conflicts().len();
    if num_conflicts > 0 {
        let suffix = if num_conflicts == 1 { "" } else { "s" };
        println!(
            "[warning] The grammar has {} conflict{}; the first computed action was kept for each.",
            num_conflicts, suffix
        );
    }

    let source = match (&args.input, &args.expr) {
        (Some(path), _) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read the input file {}", path.display()))?;
            Some(content.lines().next().unwrap_or_default().to_owned())
        }
        (None, Some(expr)) => Some(expr.clone()),
        (None, None) => None,
    };
    let Some(source) = source else {
        return Ok(());
    };

    let tokens = lexer::tokenize(&source).context("failed to scan the input")?;
    for token in &tokens {
        tracing::debug!("token: {}", token);
    }

    let tree = table.parse(tokens).context("failed to parse the input")?;

    print!("{}", tree);

    Ok(())
}
