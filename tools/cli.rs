use std::path::PathBuf;

use clap::{Parser, Subcommand};
use name_patterns::{QueryContext, RawPattern, ScopeStack, SymbolRegistry};

/// Match, list and complete names against a pattern file
#[derive(Parser, Debug)]
#[command(name = "name-patterns-cli", version)]
struct CliArgs {
    /// JSON array of symbols to resolve against
    #[arg(short = 's', long, value_name = "FILE")]
    symbols: Option<PathBuf>,

    /// JSON pattern tree
    #[arg(short = 'p', long, value_name = "FILE")]
    pattern: PathBuf,

    /// How many times repeating patterns are unrolled by `list`
    #[arg(long, value_name = "N")]
    repeat_limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints every way the pattern accepts the whole name
    Match { name: String },
    /// Prints every name the pattern can produce
    List,
    /// Prints completions with the caret at `position`, defaulting to the end of the name
    Complete {
        name: String,
        #[arg(long)]
        position: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let registry = match &args.symbols {
        Some(path) => SymbolRegistry::load_from_file(path)?,
        None => SymbolRegistry::default(),
    };
    let pattern = RawPattern::load_from_file(&args.pattern)?.compile()?;
    let mut ctx = QueryContext::new(&registry);
    if let Some(limit) = args.repeat_limit {
        ctx = ctx.with_list_repeat_limit(limit);
    }
    let scope = ScopeStack::new();

    println!("Pattern: {pattern}");
    match &args.command {
        Command::Match { name } => {
            let results = pattern.match_name(&ctx, &scope, name)?;
            if results.is_empty() {
                println!("✗ no match for '{name}'");
            }
            for result in results {
                println!("✓ {}", result.describe(name));
            }
        }
        Command::List => {
            for listed in pattern.list(&ctx, &scope)? {
                println!("- {}", listed.name);
            }
        }
        Command::Complete { name, position } => {
            let position = position.unwrap_or(name.len());
            for item in pattern.complete(&ctx, &scope, name, position)?.items {
                let priority = item.priority.unwrap_or_default();
                println!("- {item} ({priority:?})");
            }
        }
    }

    Ok(())
}
