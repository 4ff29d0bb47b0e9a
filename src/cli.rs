use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// `--set <house>:<appliance>=<count>`, house already zero-based.
#[derive(Debug, Clone, PartialEq)]
pub struct CountRequest {
    pub house: usize,
    pub appliance: String,
    pub count: usize,
}

/// `--setting <house>:<appliance>:<option>=<value>`, house already zero-based.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingRequest {
    pub house: usize,
    pub appliance: String,
    pub option: String,
    pub value: String,
}

pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub counts: Vec<CountRequest>,
    pub settings: Vec<SettingRequest>,
    pub duration: Duration,
    pub report_every: Duration,
    pub json: bool,
}

const DEFAULT_DURATION_SECS: f64 = 5.0;
const DEFAULT_REPORT_MS: u64 = 1000;

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut scenario = None;
    let mut preset = None;
    let mut counts = Vec::new();
    let mut settings = Vec::new();
    let mut duration = Duration::from_secs_f64(DEFAULT_DURATION_SECS);
    let mut report_every = Duration::from_millis(DEFAULT_REPORT_MS);
    let mut json = false;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--set" => {
                i += 1;
                let spec = args.next_or_err(
                    i,
                    "missing value for --set (expected <house>:<appliance>=<count>)",
                )?;
                counts.push(parse_count_request(spec)?);
            }
            "--setting" => {
                i += 1;
                let spec = args.next_or_err(
                    i,
                    "missing value for --setting (expected <house>:<appliance>:<option>=<value>)",
                )?;
                settings.push(parse_setting_request(spec)?);
            }
            "--duration" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --duration (expected seconds)")?;
                let secs = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s >= 0.0)
                    .ok_or_else(|| format!("--duration value \"{raw}\" is not a valid duration"))?;
                duration = Duration::from_secs_f64(secs);
            }
            "--report-every" => {
                i += 1;
                let raw = args.next_or_err(
                    i,
                    "missing value for --report-every (expected milliseconds)",
                )?;
                let ms = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .ok_or_else(|| format!("--report-every value \"{raw}\" must be a positive integer"))?;
                report_every = Duration::from_millis(ms);
            }
            "--json" => json = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if scenario.is_some() && preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if scenario.is_none() && preset.is_none() {
        preset = Some("default".to_string());
    }

    Ok(CliOptions {
        scenario,
        preset,
        counts,
        settings,
        duration,
        report_every,
        json,
    })
}

/// Splits `<house>:<rest>` and converts the one-based house to an index.
fn split_house(spec: &str) -> Result<(usize, &str), String> {
    let (house, rest) = spec
        .split_once(':')
        .ok_or_else(|| format!("\"{spec}\" is missing a `<house>:` prefix"))?;
    let house = house
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|h| *h > 0)
        .ok_or_else(|| format!("house \"{house}\" must be a number starting at 1"))?;
    Ok((house - 1, rest))
}

fn parse_count_request(spec: &str) -> Result<CountRequest, String> {
    let (house, rest) = split_house(spec)?;
    let (appliance, count) = rest
        .rsplit_once('=')
        .ok_or_else(|| format!("\"{spec}\" is missing `=<count>`"))?;
    let count = count
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("count \"{count}\" is not a valid number"))?;
    Ok(CountRequest {
        house,
        appliance: appliance.trim().to_string(),
        count,
    })
}

fn parse_setting_request(spec: &str) -> Result<SettingRequest, String> {
    let (house, rest) = split_house(spec)?;
    let (target, value) = rest
        .split_once('=')
        .ok_or_else(|| format!("\"{spec}\" is missing `=<value>`"))?;
    let (appliance, option) = target
        .rsplit_once(':')
        .ok_or_else(|| format!("\"{spec}\" is missing `<appliance>:<option>`"))?;
    Ok(SettingRequest {
        house,
        appliance: appliance.trim().to_string(),
        option: option.trim().to_string(),
        value: value.trim().to_string(),
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("houseload-sim: household appliance load simulator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  houseload-sim [--scenario <path> | --preset <name>] [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>                       Load scenario from TOML config file");
    eprintln!("  --preset <name>                         default, accelerated or single_house");
    eprintln!("  --set <house>:<appliance>=<count>       Switch units on or off (house from 1)");
    eprintln!("  --setting <house>:<appliance>:<opt>=<v> Select an appliance setting");
    eprintln!("  --duration <secs>                       Run time before exiting (default 5)");
    eprintln!("  --report-every <ms>                     Report interval (default 1000)");
    eprintln!("  --json                                  JSON lines output and logs");
    eprintln!("  --help                                  Show this help message");
}
