use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rgrok_eval::{DEFAULT_SIZE_LIMIT, Grok, GrokOptions, OutputField, PatternRegistry};
use rgrok_patterns::{FieldType, FragmentSource, load_fragment_directory, load_fragment_file};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rgrok")]
#[command(about = "Match text with grok patterns and print the extracted fields as JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match text against a grok pattern
    ///
    /// Matches a single string (--text) or every line read from stdin, and
    /// prints one JSON object per matching line.
    Match {
        /// The grok pattern, e.g. '%{IP:client} %{WORD:method}'
        pattern: String,

        /// Text to match (if omitted, reads lines from stdin)
        #[arg(short, long)]
        text: Option<String>,

        /// Match anywhere in the text instead of requiring a full match
        #[arg(short, long)]
        search: bool,

        /// Capture bare %{NAME} references as fields named NAME
        #[arg(short, long)]
        unnamed: bool,

        /// Emit null for optional fields that did not match
        #[arg(short, long)]
        keep_empty: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        patterns: PatternArgs,
    },

    /// Print the regex a grok pattern expands to, with its output fields
    Expand {
        /// The grok pattern to expand
        pattern: String,

        /// Capture bare %{NAME} references as fields named NAME
        #[arg(short, long)]
        unnamed: bool,

        #[command(flatten)]
        patterns: PatternArgs,
    },

    /// List the available pattern fragments
    List {
        /// Print names only
        #[arg(short, long)]
        names: bool,

        #[command(flatten)]
        patterns: PatternArgs,
    },

    /// Check a fragment file or directory
    ///
    /// Reports malformed lines and compiles every fragment it defines.
    Validate {
        /// Path to a fragment file or a directory of fragment files
        path: PathBuf,

        /// Show every error (not just the summary)
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Options shared by every command that resolves fragments.
#[derive(Args)]
struct PatternArgs {
    /// Directory of extra fragment files, overlaid on the bundled set
    #[arg(short = 'd', long = "patterns-dir", env = "RGROK_PATTERNS_DIR")]
    patterns_dir: Option<PathBuf>,

    /// Extra fragment as NAME=REGEX (can be specified multiple times)
    #[arg(short = 'p', long = "pattern", value_parser = parse_fragment_arg)]
    custom: Vec<(String, String)>,

    /// Regex engine memory budget in bytes
    #[arg(long, env = "RGROK_REGEX_SIZE_LIMIT", default_value_t = DEFAULT_SIZE_LIMIT)]
    size_limit: usize,
}

impl PatternArgs {
    fn options(&self) -> GrokOptions {
        let mut options = GrokOptions::new()
            .with_patterns(self.custom.iter().cloned())
            .size_limit(self.size_limit);
        if let Some(dir) = &self.patterns_dir {
            options = options.with_patterns_dir(dir.clone());
        }
        options
    }
}

fn parse_fragment_arg(s: &str) -> Result<(String, String), String> {
    let (name, template) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=REGEX, got '{s}'"))?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid fragment name '{name}'"));
    }
    Ok((name.to_string(), template.to_string()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            pattern,
            text,
            search,
            unnamed,
            keep_empty,
            pretty,
            patterns,
        } => {
            let options = patterns
                .options()
                .full_match(!search)
                .match_unnamed_groks(unnamed)
                .keep_empty_captures(keep_empty);
            cmd_match(&pattern, options, text, pretty)
        }
        Commands::Expand {
            pattern,
            unnamed,
            patterns,
        } => cmd_expand(&pattern, patterns.options().match_unnamed_groks(unnamed)),
        Commands::List { names, patterns } => cmd_list(patterns.options(), names),
        Commands::Validate { path, verbose } => cmd_validate(&path, verbose),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_match(pattern: &str, options: GrokOptions, text: Option<String>, pretty: bool) {
    let grok = compile_or_exit(pattern, options);

    if let Some(text) = text {
        match grok.parse(&text) {
            Some(record) => print_json(&record, pretty),
            None => {
                eprintln!("No match.");
                process::exit(1);
            }
        }
        return;
    }

    let stdin = io::stdin();
    let mut line_num = 0u64;
    let mut match_count = 0u64;

    for line in stdin.lock().lines() {
        line_num += 1;
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading line {line_num}: {e}");
                continue;
            }
        };

        if let Some(record) = grok.parse(&line) {
            match_count += 1;
            print_json(&record, pretty);
        } else {
            tracing::debug!(line = line_num, "no match");
        }
    }

    eprintln!("Processed {line_num} lines, {match_count} matches.");
}

/// JSON report printed by `rgrok expand`.
#[derive(Serialize)]
struct ExpandReport<'a> {
    pattern: &'a str,
    regex: &'a str,
    full_match: bool,
    fields: &'a [OutputField],
    types: &'a BTreeMap<String, FieldType>,
}

fn cmd_expand(pattern: &str, options: GrokOptions) {
    let grok = compile_or_exit(pattern, options);
    let compiled = grok.compiled();
    let report = ExpandReport {
        pattern: grok.source(),
        regex: compiled.pattern(),
        full_match: compiled.full_match(),
        fields: compiled.fields(),
        types: compiled.type_map(),
    };
    print_json(&report, true);
}

fn cmd_list(options: GrokOptions, names_only: bool) {
    let registry = match options.registry() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error loading patterns: {e}");
            process::exit(1);
        }
    };

    for name in registry.names() {
        if names_only {
            println!("{name}");
        } else {
            println!("{name}\t{}", registry.get(name).unwrap_or_default());
        }
    }
}

fn cmd_validate(path: &Path, verbose: bool) {
    let source = load_source(path);

    let mut registry = PatternRegistry::bundled();
    registry.extend_from_source(&source);
    let registry = Arc::new(registry);

    let mut names: Vec<&str> = source.fragments.iter().map(|f| f.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();

    let options = GrokOptions::default().full_match(false);
    let mut compile_errors = Vec::new();
    for name in &names {
        let pattern = format!("%{{{name}}}");
        if let Err(e) = Grok::from_registry(&pattern, Arc::clone(&registry), &options) {
            compile_errors.push(format!("{name}: {e}"));
        }
    }

    println!("Loaded {} fragments from {}", names.len(), path.display());
    println!("  Malformed lines:   {}", source.errors.len());
    println!("  Compile errors:    {}", compile_errors.len());

    if verbose && (!source.errors.is_empty() || !compile_errors.is_empty()) {
        println!("\nErrors:");
        for err in source.errors.iter().chain(&compile_errors) {
            println!("  - {err}");
        }
    }

    if !source.errors.is_empty() || !compile_errors.is_empty() {
        process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compile_or_exit(pattern: &str, options: GrokOptions) -> Grok {
    match Grok::with_options(pattern, options) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error compiling pattern: {e}");
            process::exit(1);
        }
    }
}

fn load_source(path: &Path) -> FragmentSource {
    let result = if path.is_dir() {
        load_fragment_directory(path)
    } else {
        load_fragment_file(path)
    };
    match result {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error loading fragments from {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn print_json(value: &impl Serialize, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(j) => println!("{j}"),
        Err(e) => {
            eprintln!("JSON serialization error: {e}");
            process::exit(1);
        }
    }
}
