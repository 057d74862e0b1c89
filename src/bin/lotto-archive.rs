use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lotto_archive::{
    ArchiveStore, Combination, Config, GenerateRequest, Generator, HttpBatchSource, JsonFileStore,
    Outcome, Reconciler, WeightMode,
};

const USAGE: &str = "\
Usage: lotto-archive [fetch | generate [options]]

Commands:
  fetch                 Bring the archive up to date (default)
  generate              Draw a combination avoiding archived results

Generate options:
  -i, --include LIST    Comma-separated numbers that must appear
  -x, --exclude LIST    Comma-separated numbers that must not appear
  -m, --mode MODE       random | hot | cold (default: random)
  -n, --count N         How many combinations to draw (default: 1)

Environment:
  LOTTO_CONFIG          JSON configuration file
  LOTTO_ARCHIVE_PATH    Archive file (default: winning_numbers.json)
  LOTTO_SOURCE_URL      Draw-history endpoint
  RUST_LOG              Log filter (default: lotto_archive=info)";

enum Command {
    Fetch,
    Generate {
        request: GenerateRequest,
        count: usize,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("lotto_archive=info".parse()?),
        )
        .init();

    let command = parse_args(std::env::args().skip(1))?;
    let config = load_config()?;

    match command {
        Command::Fetch => fetch(&config).await,
        Command::Generate { request, count } => generate(&config, &request, count).await,
    }
}

fn load_config() -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match std::env::var("LOTTO_CONFIG") {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::default(),
    };

    if let Ok(path) = std::env::var("LOTTO_ARCHIVE_PATH") {
        config.archive_path = PathBuf::from(path);
    }
    if let Ok(url) = std::env::var("LOTTO_SOURCE_URL") {
        config.source.url = url;
    }

    config.validate()?;
    Ok(config)
}

async fn fetch(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let source = Arc::new(HttpBatchSource::new(&config.source)?);
    let store = Arc::new(JsonFileStore::new(&config.archive_path));
    tracing::info!(source = source.url(), archive = %store.describe(), "Fetching draw history");

    let report = Reconciler::new(source, store, config).run().await?;

    println!(
        "Total rounds: {} ({} new)",
        report.total_rounds, report.new_rounds
    );
    if report.unsaved_rounds > 0 {
        println!(
            "{} rounds past a missing round were not saved",
            report.unsaved_rounds
        );
    }
    if report.outcome == Outcome::Failed {
        let reason = report.last_error.unwrap_or_default();
        return Err(format!(
            "stopped after repeated failures ({reason}); {} rounds recovered",
            report.new_rounds
        )
        .into());
    }
    Ok(())
}

async fn generate(
    config: &Config,
    request: &GenerateRequest,
    count: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let archive = JsonFileStore::new(&config.archive_path).load().await;
    let generator = Generator::new(&archive, config.generator.max_attempts);
    let mut rng = rand::thread_rng();

    for _ in 0..count {
        let generated = generator.generate(request, &mut rng)?;
        let balls: Vec<String> = generated
            .combination
            .numbers()
            .iter()
            .map(|&n| format!("{n}(band {})", Combination::color_band(n)))
            .collect();
        let note = if generated.is_historical_match {
            "  [matches a past draw]"
        } else {
            ""
        };
        println!("{}  {}{}", generated.combination, balls.join(" "), note);
    }
    Ok(())
}

fn parse_args(
    args: impl IntoIterator<Item = String>,
) -> Result<Command, Box<dyn std::error::Error + Send + Sync>> {
    let mut args = args.into_iter();
    let Some(first) = args.next() else {
        return Ok(Command::Fetch);
    };

    match first.as_str() {
        "fetch" => match args.next() {
            None => Ok(Command::Fetch),
            Some(a) => Err(format!("Unknown arg: {a}").into()),
        },
        "generate" => {
            let mut request = GenerateRequest::default();
            let mut count = 1usize;
            while let Some(a) = args.next() {
                match a.as_str() {
                    "-i" | "--include" => {
                        let v = args.next().ok_or("Missing value for --include")?;
                        request.include = parse_numbers(&v)?;
                    }
                    "-x" | "--exclude" => {
                        let v = args.next().ok_or("Missing value for --exclude")?;
                        request.exclude = parse_numbers(&v)?;
                    }
                    "-m" | "--mode" => {
                        let v = args.next().ok_or("Missing value for --mode")?;
                        request.mode = v.parse::<WeightMode>()?;
                    }
                    "-n" | "--count" => {
                        count = args.next().ok_or("Missing value for --count")?.parse()?;
                    }
                    _ => return Err(format!("Unknown arg: {a}").into()),
                }
            }
            Ok(Command::Generate { request, count })
        }
        "-h" | "--help" => {
            println!("{USAGE}");
            std::process::exit(0);
        }
        other => Err(format!("Unknown command: {other}\n\n{USAGE}").into()),
    }
}

fn parse_numbers(s: &str) -> Result<BTreeSet<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let mut out = BTreeSet::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        out.insert(part.parse::<u8>()?);
    }
    Ok(out)
}
