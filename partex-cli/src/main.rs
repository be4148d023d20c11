use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use log::debug;
use partex::{Dfa, Matcher, Nfa, Pattern, Sorter, emit, parse};

#[derive(Parser)]
#[command(name = "partex")]
#[command(about = "Partex - order grammar alternatives and guard them with lookaheads")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort a pattern and report the plan for every choice
    Sort {
        /// The pattern, in notation form
        pattern: String,
    },
    /// Sort a pattern and print only the emitted regex
    Emit {
        /// The pattern, in notation form
        pattern: String,
    },
    /// Sort a pattern and run it against input
    Match {
        /// The pattern, in notation form
        pattern: String,
        /// The input string
        input: String,
    },
    /// Print the automaton of a pattern's root
    Describe {
        /// The pattern, in notation form
        pattern: String,
        /// Run the raw and minimized automata over this input
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Sort { pattern } => cmd_sort(&pattern),
        Commands::Emit { pattern } => cmd_emit(&pattern),
        Commands::Match { pattern, input } => cmd_match(&pattern, &input),
        Commands::Describe { pattern, input } => cmd_describe(&pattern, input.as_deref()),
    }
}

/// `RUST_LOG` wins over the `-v` count
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn or_exit<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn load(pattern: &str) -> Pattern {
    let parsed = or_exit(parse(pattern));
    debug!("parsed {:?}", parsed);
    parsed
}

fn cmd_sort(pattern: &str) {
    println!("{}", "Sorting pattern...".bold());
    println!("  Pattern: {}", pattern.cyan());
    println!();

    let parsed = load(pattern);
    let mut sorter = Sorter::new();
    let sorted = or_exit(sorter.sort(&parsed));

    for report in sorter.into_reports() {
        println!(
            "{} {} ({} states)",
            "Choice".bold(),
            report.choice,
            report.states
        );
        println!("  Order:   {:?}", report.order);
        if report.subsets.is_empty() {
            println!("  Subsets: {}", "none".dimmed());
        } else {
            let pairs: Vec<String> = report
                .subsets
                .iter()
                .map(|(x, y)| format!("{} ⊆ {}", x, y))
                .collect();
            println!("  Subsets: {}", pairs.join(", "));
        }
        for (branch, discriminator) in report.discriminators.iter().enumerate() {
            if let Some(discriminator) = discriminator {
                println!("  Branch {}: {}", branch, discriminator.to_string().yellow());
            }
        }
        println!();
    }

    println!("{}", "Output:".bold());
    println!("  {}", emit(&sorted).green());
}

fn cmd_emit(pattern: &str) {
    println!("{}", or_exit(partex::compile(pattern)));
}

fn cmd_match(pattern: &str, input: &str) {
    let sorted = or_exit(partex::sort(&load(pattern)));
    let matcher = Matcher::new(&sorted);

    println!("{}", "Matching pattern...".bold());
    println!("  Sorted: {}", emit(&sorted).cyan());
    println!("  Input:  {}", input.yellow());
    println!();

    match matcher.find(input) {
        Some(m) => {
            println!("{}", "✓ Match found!".green().bold());
            println!("  Position: {}..{}", m.start, m.end);
            println!("  Match:    {}", m.as_str(input).green());
            if let Some(branch) = m.branch {
                println!("  Branch:   {}", branch);
            }
        }
        None => println!("{}", "✗ No match".red()),
    }
}

fn cmd_describe(pattern: &str, input: Option<&str>) {
    let parsed = load(pattern);
    let nfa = or_exit(Nfa::from_pattern(0, &parsed));
    let raw = Dfa::from_nfa(&nfa);
    let dfa = raw.minimized();

    println!("{}", "Sizes:".bold());
    println!("  NFA:           {} states", nfa.states.len());
    println!("  DFA:           {} states", raw.len());
    println!("  Minimized DFA: {} states", dfa.len());
    println!();

    println!(
        "{} {} states ({} pre-match, {} match, {} post-match)",
        "Automaton:".bold(),
        dfa.len(),
        dfa.pre_match_states().len(),
        dfa.match_states().len(),
        dfa.post_match_states().len()
    );
    print!("{}", dfa);

    if !dfa.post_match_states().is_empty() {
        println!();
        println!(
            "{} post-match states found; some branches continue past others",
            "Warning:".yellow().bold()
        );
    }

    if let Some(input) = input {
        println!();
        println!("{} {}", "Input:".bold(), input.yellow());
        for (name, automaton) in [("DFA", &raw), ("Minimized DFA", &dfa)] {
            let branches: Vec<usize> = automaton
                .markers_after(input)
                .iter()
                .map(|marker| marker.branch)
                .collect();
            if branches.is_empty() {
                println!("  {:<14} {}", format!("{name}:"), "no match".red());
            } else {
                println!("  {:<14} {}", format!("{name}:"), format!("branches {:?}", branches).green());
            }
        }
    }
}
