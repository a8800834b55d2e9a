use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use gate_oracle::oracle_ir::{Configuration, Operation};
use gate_oracle::search::{hit_count, run, HitRule, SearchConfig, SearchOutcome, SearchRun, HIGH_BITS_MASK};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oracle", version, about = "Random search for narrow-hit 8-bit gate oracles")]
struct Cli {
    /// Log every new lowest hit count
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample random configurations until one lands inside the band
    Search {
        /// JSON search config; flags below override its fields
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        length: Option<usize>,
        #[arg(long)]
        lower: Option<u32>,
        #[arg(long)]
        upper: Option<u32>,
        /// Comma-separated subset of negate,and,or,xor
        #[arg(long)]
        ops: Option<String>,
        /// any-set | clear
        #[arg(long)]
        rule: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Evaluate a configuration such as [[1,0,1,2],[0,3,3,5]]
    Eval {
        #[arg(long)]
        configuration: String,
        /// Single input (decimal, 0b… or 0x…); omit to score all 256 inputs
        #[arg(long)]
        input: Option<String>,
        #[arg(long, default_value = "any-set")]
        rule: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Search {
            config,
            iterations,
            length,
            lower,
            upper,
            ops,
            rule,
            seed,
            json,
        } => {
            let mut cfg = match config {
                Some(path) => SearchConfig::from_json_file(&path)?,
                None => SearchConfig::default(),
            };
            if let Some(n) = iterations {
                cfg.max_iterations = n;
            }
            if let Some(n) = length {
                cfg.configuration_length = n;
            }
            if let Some(n) = lower {
                cfg.band.lower = n;
            }
            if let Some(n) = upper {
                cfg.band.upper = n;
            }
            if let Some(list) = ops {
                cfg.operations = parse_operations(&list)?;
            }
            if let Some(name) = rule {
                cfg.hit_rule = parse_rule(&name)?;
            }
            if seed.is_some() {
                cfg.seed = seed;
            }
            let result = run(&cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&search_json(&result))?);
            } else {
                print_search(&result);
            }
        }
        Commands::Eval {
            configuration,
            input,
            rule,
            json,
        } => {
            let config: Configuration = configuration.parse()?;
            let rule = parse_rule(&rule)?;
            match input {
                Some(text) => {
                    let x = parse_register(&text)?;
                    let out = config.evaluate(x);
                    if json {
                        println!("{}", json!({ "input": x, "output": out }));
                    } else {
                        println!("Input: {:08b}", x);
                        println!("Output: {:08b}", out);
                    }
                }
                None => {
                    let hits = hit_count(&config, rule, HIGH_BITS_MASK);
                    let fixed = config.fixed_points();
                    if json {
                        let report = json!({
                            "configuration": config.canonical_text(),
                            "config_hash": config.hash(),
                            "rule": rule.as_str(),
                            "hits": hits,
                            "fixed_points": fixed,
                        });
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        println!("Configurations: {}", config);
                        println!("Hits: {} (rule={})", hits, rule.as_str());
                        println!("Fixed points: {}", fixed);
                        println!("Identity: blake3:{}", config.hash());
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_search(result: &SearchRun) {
    println!("Seed: {}", result.seed);
    match &result.outcome {
        SearchOutcome::Accepted { best, iterations, .. } => {
            println!("Configurations: {}", best.configuration);
            println!("Hits: {}", best.hits);
            println!("Iterations: {}", iterations);
        }
        SearchOutcome::Exhausted { iterations, best, .. } => {
            println!("No configuration accepted after {} iterations", iterations);
            if let Some(best) = best {
                println!("Closest: {}", best.configuration);
            }
        }
    }
    match result.outcome.lowest_hits() {
        Some(lowest) => println!("Lowest hits: {}", lowest),
        None => println!("Lowest hits: none"),
    }
}

fn search_json(result: &SearchRun) -> serde_json::Value {
    let best = result.outcome.best();
    json!({
        "seed": result.seed,
        "accepted": result.outcome.is_accepted(),
        "configuration": best.map(|b| b.configuration.canonical_text()),
        "config_hash": best.map(|b| b.configuration.hash()),
        "result": result.outcome,
    })
}

fn parse_operations(list: &str) -> Result<Vec<Operation>> {
    let ops = list
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(|name| Operation::from_name(name).ok_or_else(|| anyhow!("unknown operation: {}", name)))
        .collect::<Result<Vec<_>>>()?;
    if ops.is_empty() {
        return Err(anyhow!("--ops needs at least one operation"));
    }
    Ok(ops)
}

fn parse_rule(name: &str) -> Result<HitRule> {
    HitRule::from_name(name).ok_or_else(|| anyhow!("unknown hit rule: {} (expected any-set or clear)", name))
}

fn parse_register(text: &str) -> Result<u8> {
    let text = text.trim();
    let parsed = if let Some(bits) = text.strip_prefix("0b") {
        u8::from_str_radix(&bits.replace('_', ""), 2)
    } else if let Some(hex) = text.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
    } else {
        text.parse::<u8>()
    };
    parsed.map_err(|e| anyhow!("invalid register value {}: {}", text, e))
}
