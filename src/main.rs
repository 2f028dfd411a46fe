//! Seizure Stream CLI
//!
//! Simulated real-time seizure detection over recorded EEG segments.

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use seizure_stream::{
    audit::{create_shared_log, SharedAuditLog},
    config::{Config, SetLabels},
    core::{
        window_features, AlertEvent, CancelToken, DetectionEvent, FeatureExtractor, LogisticScorer,
        Pacer, WindowSpec,
    },
    dataset::{load_dataset, stratified_split, Label, Segment},
    stream::{default_workers, Pipeline, StreamEvent, StreamMessage, StreamObserver, StreamSummary},
    LABEL_CONVENTION, VERSION,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seizure-stream")]
#[command(version = VERSION)]
#[command(about = "Simulated real-time seizure detection for single-channel EEG", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Set label overrides, e.g. "S=1,F=0"
    #[arg(long, global = true)]
    labels: Option<String>,

    /// Dataset root directory (one sub-directory per set)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay segments window by window and raise alerts
    Stream {
        /// Model parameters (JSON)
        #[arg(long)]
        model: PathBuf,

        /// Segments to replay; defaults to one random normal and one random seizure test segment
        #[arg(long = "segment")]
        segments: Vec<String>,

        /// Replay speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Do not sleep between windows
        #[arg(long)]
        no_pace: bool,

        /// Emit events as JSON lines instead of console text
        #[arg(long)]
        jsonl: bool,

        /// Seed for the demo segment choice
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score every test segment in parallel, without pacing
    Score {
        /// Model parameters (JSON)
        #[arg(long)]
        model: PathBuf,

        /// Worker threads (defaults to available cores)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Export per-window features as CSV for model training
    Features {
        /// Output CSV file
        #[arg(long, short)]
        output: PathBuf,

        /// Which partition to export
        #[arg(long, value_enum, default_value = "train")]
        partition: Partition,
    },

    /// Show configuration
    Config,

    /// Show the set label convention
    Labels,
}

#[derive(Clone, Copy, ValueEnum)]
enum Partition {
    Train,
    Test,
    All,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match cli.command {
        Commands::Stream {
            model,
            segments,
            speed,
            no_pace,
            jsonl,
            seed,
        } => {
            cmd_stream(config, &model, &segments, speed, no_pace, jsonl, seed);
        }
        Commands::Score { model, workers } => {
            cmd_score(config, &model, workers);
        }
        Commands::Features { output, partition } => {
            cmd_features(config, &output, partition);
        }
        Commands::Config => {
            cmd_config(&config, cli.config.as_deref());
        }
        Commands::Labels => {
            cmd_labels(&config);
        }
    }
}

fn cmd_stream(
    mut config: Config,
    model: &Path,
    segment_ids: &[String],
    speed: Option<f64>,
    no_pace: bool,
    jsonl: bool,
    seed: Option<u64>,
) {
    if let Some(speed) = speed {
        config.simulated_speed = speed;
    }
    if no_pace {
        config.pacing = false;
    }

    let pipeline = build_pipeline(config, model);
    let config = pipeline.config();

    let selected: Vec<Segment> = if segment_ids.is_empty() {
        let (_, test) = load_split(config, !jsonl);
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let normals: Vec<&Segment> = test.iter().filter(|s| !s.label().is_seizure()).collect();
        let seizures: Vec<&Segment> = test.iter().filter(|s| s.label().is_seizure()).collect();

        let mut chosen = Vec::new();
        for pool in [normals, seizures] {
            match pool.choose(&mut rng) {
                Some(segment) => chosen.push((*segment).clone()),
                None => eprintln!("Warning: no test segments of one class, skipping it."),
            }
        }
        chosen
    } else {
        let all = load_all(config, !jsonl);
        let mut chosen = Vec::new();
        for id in segment_ids {
            match all.iter().find(|s| s.segment_id() == id) {
                Some(segment) => chosen.push(segment.clone()),
                None => {
                    eprintln!("Error: segment '{id}' not found in {:?}", config.data_dir);
                    std::process::exit(1);
                }
            }
        }
        chosen
    };

    if selected.is_empty() {
        eprintln!("Error: nothing to stream.");
        std::process::exit(1);
    }

    let cancel = CancelToken::new();
    ctrlc_handler(cancel.clone());

    let pacer = Pacer::from_config(config);
    let audit_log = create_shared_log();
    let mut observer = ConsoleObserver::new(jsonl);

    if !jsonl {
        println!();
        println!("{}", "=".repeat(50));
        println!("Simulated Real-Time Streaming");
        match pacer.interval() {
            Some(interval) => println!(
                "  {:.2}s between windows ({}x real time)",
                interval.as_secs_f64(),
                config.simulated_speed
            ),
            None => println!("  Pacing disabled"),
        }
        println!("  Press Ctrl+C to stop");
    }

    for segment in &selected {
        let summary = pipeline.run(segment, &pacer, &cancel, &mut observer);
        audit_log.record_summary(&summary);
        if summary.cancelled {
            break;
        }
    }

    if !jsonl {
        println!();
        println!("{}", audit_log.summary());
    }
}

fn cmd_score(mut config: Config, model: &Path, workers: Option<usize>) {
    config.pacing = false;
    let pipeline = build_pipeline(config, model);
    let (_, test) = load_split(pipeline.config(), true);

    let cancel = CancelToken::new();
    ctrlc_handler(cancel.clone());

    let workers = workers.unwrap_or_else(default_workers);
    println!("Scoring {} test segments on {} worker(s)...", test.len(), workers);
    println!();

    let audit_log: SharedAuditLog = create_shared_log();
    let summaries = pipeline.run_parallel(&test, workers, &Pacer::disabled(), &cancel, |message| {
        if let StreamMessage::Finished(summary) = message {
            audit_log.record_summary(&summary);
            print_summary_line(&summary);
        }
    });

    let alerted = |label: Label| {
        let of_label: Vec<&StreamSummary> = summaries.iter().filter(|s| s.label == label).collect();
        let hits = of_label.iter().filter(|s| s.alerts > 0).count();
        (hits, of_label.len())
    };
    let (seizure_hits, seizure_total) = alerted(Label::Seizure);
    let (normal_hits, normal_total) = alerted(Label::Normal);

    println!();
    println!("Seizure segments alerted: {seizure_hits}/{seizure_total}");
    println!("Normal segments alerted:  {normal_hits}/{normal_total}");
    println!();
    println!("{}", audit_log.summary());
}

fn cmd_features(config: Config, output: &Path, partition: Partition) {
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let (train, test) = load_split(&config, true);
    let segments: Vec<Segment> = match partition {
        Partition::Train => train,
        Partition::Test => test,
        Partition::All => train.into_iter().chain(test).collect(),
    };

    let (spec, extractor) = match (
        WindowSpec::from_config(&config),
        FeatureExtractor::from_config(&config),
    ) {
        (Ok(spec), Ok(extractor)) => (spec, extractor),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Extracting features...");
    let set = window_features(&segments, &spec, &extractor);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating {parent:?}: {e}");
            std::process::exit(1);
        }
    }

    let result = File::create(output)
        .and_then(|file| set.write_csv(&extractor.feature_names(), BufWriter::new(file)));
    match result {
        Ok(()) => println!(
            "Wrote {} windows from {} segments to {:?}",
            set.len(),
            segments.len(),
            output
        ),
        Err(e) => {
            eprintln!("Error writing features: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config(config: &Config, explicit: Option<&Path>) {
    println!("Configuration");
    println!("=============");
    println!();
    match explicit {
        Some(path) => println!("Config file: {path:?}"),
        None => println!("Config file: {:?}", Config::config_path()),
    }
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_labels(config: &Config) {
    println!("{LABEL_CONVENTION}");
    println!("Effective labels:");
    for (set, label) in config.set_labels.iter() {
        println!("  {set} -> {} ({label})", u8::from(label));
    }
}

/// Prints a segment's events as they happen.
struct ConsoleObserver {
    jsonl: bool,
    windows: usize,
}

impl ConsoleObserver {
    fn new(jsonl: bool) -> Self {
        Self { jsonl, windows: 0 }
    }

    fn emit_json(&self, message: &StreamMessage) {
        match serde_json::to_string(message) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Error serializing event: {e}"),
        }
    }
}

impl StreamObserver for ConsoleObserver {
    fn on_start(&mut self, segment: &Segment, windows: usize) {
        self.windows = windows;
        if self.jsonl {
            self.emit_json(&StreamMessage::Started {
                segment_id: segment.segment_id().to_string(),
                windows,
            });
            return;
        }

        println!();
        let kind = if segment.label().is_seizure() { "Ictal" } else { "Non-ictal" };
        println!("--- {kind} segment ---");
        println!("{}", "=".repeat(50));
        println!(
            "Streaming segment: {} (set={}, true={})",
            segment.segment_id(),
            segment.set_name(),
            segment.label()
        );
        println!("{}", "=".repeat(50));
    }

    fn on_detection(&mut self, segment: &Segment, event: &DetectionEvent) {
        if self.jsonl {
            self.emit_json(&StreamMessage::Event {
                segment_id: segment.segment_id().to_string(),
                event: StreamEvent::Detection(event.clone()),
            });
            return;
        }

        let status = if event.prediction { "⚡ SEIZURE" } else { "  normal " };
        let probability = match event.probability {
            Some(p) => format!("P={p:.2}"),
            None => "P=----".to_string(),
        };
        println!(
            "  Window {:3}/{} | {} | {} | consecutive={}",
            event.window_number(),
            self.windows,
            status,
            probability,
            event.consecutive
        );
        if let Some(error) = &event.error {
            println!("    (not scored: {error})");
        }
    }

    fn on_alert(&mut self, segment: &Segment, event: &AlertEvent) {
        if self.jsonl {
            self.emit_json(&StreamMessage::Event {
                segment_id: segment.segment_id().to_string(),
                event: StreamEvent::Alert(*event),
            });
            return;
        }

        println!();
        println!("  🚨  SEIZURE ALERT: {} consecutive detections  🚨", event.count);
        println!();
    }

    fn on_finish(&mut self, summary: &StreamSummary) {
        if self.jsonl {
            self.emit_json(&StreamMessage::Finished(summary.clone()));
            return;
        }

        println!();
        if summary.cancelled {
            println!(
                "Stopped after {}/{} windows. True label: {}",
                summary.windows_processed, summary.windows_total, summary.label
            );
        } else {
            println!(
                "Done in {:.1}s. True label: {}",
                summary.duration_secs(),
                summary.label
            );
        }
    }
}

fn print_summary_line(summary: &StreamSummary) {
    println!(
        "  {:>8} | set={} | true={:<7} | windows={:3} | detections={:3} | alerts={}{}",
        summary.segment_id,
        summary.set_name,
        summary.label.to_string(),
        summary.windows_processed,
        summary.detections,
        summary.alerts,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
}

/// Load the effective configuration, applying command-line overrides.
fn load_config(cli: &Cli) -> Config {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };

    if let Some(labels) = &cli.labels {
        match SetLabels::from_csv(labels) {
            Ok(labels) => config.set_labels = labels,
            Err(e) => {
                eprintln!("Error: --labels: {e}");
                std::process::exit(1);
            }
        }
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    config
}

/// Load the model and build a pipeline around it.
fn build_pipeline(config: Config, model: &Path) -> Pipeline<LogisticScorer> {
    let scorer = match LogisticScorer::load(model) {
        Ok(scorer) => scorer,
        Err(e) => {
            eprintln!("Error loading model {model:?}: {e}");
            std::process::exit(1);
        }
    };

    let pipeline = match Pipeline::new(config, scorer) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let expected = pipeline.extractor().feature_len();
    if pipeline.scorer().feature_len() != expected {
        eprintln!(
            "Error: model expects {} features but the configured bands produce {}",
            pipeline.scorer().feature_len(),
            expected
        );
        std::process::exit(1);
    }
    pipeline
}

fn load_all(config: &Config, verbose: bool) -> Vec<Segment> {
    if verbose {
        println!("Loading dataset...");
    }
    match load_dataset(&config.data_dir, &config.set_labels) {
        Ok(segments) => {
            if verbose {
                println!("Loaded {} segments.", segments.len());
            }
            segments
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Check data_dir in the config or pass --data-dir.");
            std::process::exit(1);
        }
    }
}

fn load_split(config: &Config, verbose: bool) -> (Vec<Segment>, Vec<Segment>) {
    let segments = load_all(config, verbose);
    let (train, test) = stratified_split(segments, config.test_size, config.split_seed);
    if verbose {
        println!("  {} train segments, {} test segments", train.len(), test.len());
    }
    (train, test)
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(cancel: CancelToken) {
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        eprintln!("Warning: could not install Ctrl+C handler: {e}");
    }
}
