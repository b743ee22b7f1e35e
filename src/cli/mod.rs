//! calhousing CLI module
//!
//! Command-line interface for fetching the dataset, training, evaluating
//! and predicting house values.

mod prompt;

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::AppConfig;
use crate::data::{load_housing_csv, DatasetFetcher, HousingRecord, NumericColumn, OceanProximity};
use crate::export::{ArtifactKind, ArtifactMetadata, ArtifactStore};
use crate::inference::{FormInput, Predictor};
use crate::preprocessing::{PreprocessingConfig, UnknownCategoryPolicy};
use crate::split::{income_category_proportions, StratifiedSplit};
use crate::training::{evaluate, targets, MaxFeatures, RegressionMetrics, TrainEngine, TrainingConfig, TrainingReport};

pub use prompt::prompt_missing;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("    {} {}", ok("done"), dim(detail));
}

fn step_err(msg: &str) {
    println!("  {} {}", "✗".red(), msg.red());
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn wait_enter() {
    println!();
    println!("  {}", dim("press enter to continue"));
    let mut input = String::new();
    let _ = std::io::stdin().read_line(&mut input);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "calhousing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "California housing price model: fetch, train, evaluate, predict")]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Overrides for the environment-derived configuration
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory for housing.tgz and housing.csv
    #[arg(long, global = true, env = "HOUSING_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for the persisted pipeline and model
    #[arg(long, global = true, env = "HOUSING_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Seed for the split and the forest
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

impl GlobalArgs {
    /// Environment defaults with flag overrides applied
    pub fn to_config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir.clone());
        }
        if let Some(dir) = &self.model_dir {
            config = config.with_model_dir(dir.clone());
        }
        if let Some(seed) = self.seed {
            config = config.with_random_state(seed);
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and extract the housing dataset
    Fetch {
        /// Archive URL
        #[arg(long, env = "HOUSING_URL")]
        url: Option<String>,

        /// Download attempts before giving up
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Train the pipeline and the random forest, then save both
    Train(TrainArgs),

    /// Score the saved model on the held-out test set
    Evaluate,

    /// Predict the median house value of one census block
    Predict(PredictArgs),

    /// Show dataset and artifact information
    Info,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Number of trees
    #[arg(short = 'n', long, default_value = "100")]
    pub n_estimators: usize,

    /// Maximum tree depth (unbounded when omitted)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Features tried per split: all, sqrt, log2, a fraction or a count
    #[arg(long, default_value = "all", value_parser = parse_max_features)]
    pub max_features: MaxFeatures,

    /// Minimum samples in a leaf
    #[arg(long, default_value = "1")]
    pub min_samples_leaf: usize,

    /// Fraction of records held out for testing
    #[arg(long)]
    pub test_ratio: Option<f64>,

    /// Reject ocean_proximity values unseen during training instead of zero-encoding them
    #[arg(long)]
    pub strict_categories: bool,
}

impl Default for TrainArgs {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            max_features: MaxFeatures::All,
            min_samples_leaf: 1,
            test_ratio: None,
            strict_categories: false,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PredictArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,
    #[arg(long)]
    pub latitude: Option<f64>,
    #[arg(long)]
    pub housing_median_age: Option<f64>,
    #[arg(long)]
    pub total_rooms: Option<f64>,
    #[arg(long)]
    pub total_bedrooms: Option<f64>,
    #[arg(long)]
    pub population: Option<f64>,
    #[arg(long)]
    pub households: Option<f64>,
    #[arg(long)]
    pub median_income: Option<f64>,
    /// One of: "<1H OCEAN", INLAND, ISLAND, "NEAR BAY", "NEAR OCEAN"
    #[arg(long)]
    pub ocean_proximity: Option<String>,
}

impl PredictArgs {
    /// Values given on the command line, in feature order
    pub fn values(&self) -> [Option<f64>; 8] {
        [
            self.longitude,
            self.latitude,
            self.housing_median_age,
            self.total_rooms,
            self.total_bedrooms,
            self.population,
            self.households,
            self.median_income,
        ]
    }
}

/// Parse `--max-features`
pub fn parse_max_features(s: &str) -> std::result::Result<MaxFeatures, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "all" => Ok(MaxFeatures::All),
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        other => {
            if let Ok(n) = other.parse::<usize>() {
                return Ok(MaxFeatures::Fixed(n));
            }
            match other.parse::<f64>() {
                Ok(f) if f > 0.0 && f <= 1.0 => Ok(MaxFeatures::Fraction(f)),
                _ => Err(format!(
                    "expected all, sqrt, log2, a fraction in (0, 1] or a count, got {:?}",
                    s
                )),
            }
        }
    }
}

// ─── Fetch ─────────────────────────────────────────────────────────────────────

pub async fn cmd_fetch(config: &AppConfig) -> anyhow::Result<PathBuf> {
    section("Fetch");

    step_run("Locating housing dataset");
    let start = Instant::now();
    let csv_path = DatasetFetcher::from_config(config).fetch().await?;
    step_done(&format!("{} in {:?}", csv_path.display(), start.elapsed()));

    Ok(csv_path)
}

// ─── Train ─────────────────────────────────────────────────────────────────────

pub async fn cmd_train(config: &AppConfig, args: &TrainArgs) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(ratio) = args.test_ratio {
        config = config.with_test_ratio(ratio);
    }
    config.validate()?;

    let csv_path = cmd_fetch(&config).await?;

    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let records = load_housing_csv(&csv_path)?;
    step_done(&format!("{} records in {:?}", records.len(), start.elapsed()));

    let mut training = TrainingConfig::new()
        .with_n_estimators(args.n_estimators)
        .with_random_state(config.random_state)
        .with_max_features(args.max_features)
        .with_min_samples_leaf(args.min_samples_leaf);
    if let Some(depth) = args.max_depth {
        training = training.with_max_depth(depth);
    }

    let policy = if args.strict_categories {
        UnknownCategoryPolicy::Error
    } else {
        UnknownCategoryPolicy::Ignore
    };
    let engine = TrainEngine::new(training)
        .with_preprocessing(PreprocessingConfig::new().with_unknown_category(policy))
        .with_test_ratio(config.test_ratio);

    step_run(&format!("Training random forest ({} trees)", args.n_estimators.to_string().cyan()));
    let start = Instant::now();
    let store = ArtifactStore::new(&config.model_dir);
    let trained = engine.train_and_save(&records, &store)?;
    step_done(&format!("{:?}", start.elapsed()));

    let report = &trained.report;
    println!();
    println!("  {:<16} {}", muted("Train / test"), format!("{} / {}", report.n_train, report.n_test).white());
    println!("  {:<16} {}", muted("Features"), report.feature_names.len().to_string().white());
    print_metrics(&report.test_metrics);
    println!("  {:<16} {}", muted("Time"), format!("{:.3}s", report.training_time_secs).white());

    section("Top features");
    for (name, importance) in report.importances.iter().take(5) {
        println!("  {:<28} {}", name, format!("{:.4}", importance).white());
    }

    println!();
    step_ok(&format!("Saved {}", store.pipeline_path().display()));
    step_ok(&format!("Saved {}", store.model_path().display()));
    step_ok(&format!("Saved {}", store.report_path().display()));
    println!();

    Ok(())
}

fn print_metrics(metrics: &RegressionMetrics) {
    println!("  {:<16} {}", muted("RMSE"), format!("{:.2}", metrics.rmse).white().bold());
    println!("  {:<16} {}", muted("MAE"), format!("{:.2}", metrics.mae).white());
    println!("  {:<16} {}", muted("R²"), format!("{:.4}", metrics.r2).white());
}

// ─── Evaluate ──────────────────────────────────────────────────────────────────

pub fn cmd_evaluate(config: &AppConfig) -> anyhow::Result<()> {
    section("Evaluate");

    let store = ArtifactStore::new(&config.model_dir);
    step_run("Loading artifacts");
    let predictor = Predictor::load(&config.model_dir)?;
    let metadata = store.metadata(ArtifactKind::Model)?;
    step_done(&format!("{} trees", predictor.model().n_trees()));

    // Rebuild the split the model was trained with
    let seed = hyperparameter(&metadata, "random_state").unwrap_or(config.random_state);
    let ratio = hyperparameter(&metadata, "test_ratio").unwrap_or(config.test_ratio);

    step_run("Loading data");
    let records = load_housing_csv(&config.csv_path())?;
    let split = StratifiedSplit::new(ratio).with_random_state(seed).split(&records)?;
    step_done(&format!("{} test records", split.test.len()));

    let x_test = predictor.pipeline().transform(&split.test)?;
    let y_test = targets(&split.test)?;
    let metrics = evaluate(predictor.model(), &x_test, &y_test)?;

    println!();
    print_metrics(&metrics);
    println!();

    Ok(())
}

fn hyperparameter<T: std::str::FromStr>(metadata: &ArtifactMetadata, key: &str) -> Option<T> {
    metadata.hyperparameters.get(key).and_then(|v| v.parse().ok())
}

// ─── Predict ───────────────────────────────────────────────────────────────────

pub fn cmd_predict(config: &AppConfig, args: &PredictArgs) -> anyhow::Result<()> {
    section("Predict");

    let predictor = Predictor::load(&config.model_dir)?;
    let input = if std::io::stdin().is_terminal() {
        prompt_missing(args)?
    } else {
        form_from_flags(args)?
    };
    let prediction = predictor.predict_form(&input)?;

    println!();
    println!(
        "  {} {}",
        muted("Predicted median house value:"),
        prediction.formatted().green().bold()
    );
    println!("  {}", dim(&format!("computed in {:.2?}", prediction.latency)));
    println!();

    Ok(())
}

/// Parse `--ocean-proximity`
pub fn parse_ocean_proximity(s: &str) -> anyhow::Result<OceanProximity> {
    Ok(s.parse::<OceanProximity>()?)
}

// ─── Info ──────────────────────────────────────────────────────────────────────

pub fn cmd_info(config: &AppConfig) -> anyhow::Result<()> {
    section("Configuration");

    println!("  {:<14} {}", muted("Data dir"), config.data_dir.display());
    println!("  {:<14} {}", muted("Model dir"), config.model_dir.display());
    println!("  {:<14} {}", muted("Dataset URL"), config.dataset_url);
    println!("  {:<14} {}", muted("Seed"), config.random_state);
    println!("  {:<14} {}", muted("Test ratio"), config.test_ratio);

    section("Dataset");
    let csv_path = config.csv_path();
    if csv_path.exists() {
        let records = load_housing_csv(&csv_path)?;
        show_dataset_info(&records)?;
    } else {
        println!("  {}", dim("not downloaded; run `calhousing fetch`"));
    }

    section("Artifacts");
    let store = ArtifactStore::new(&config.model_dir);
    if store.exists() {
        for kind in [ArtifactKind::Pipeline, ArtifactKind::Model] {
            match store.metadata(kind) {
                Ok(metadata) => show_artifact_info(kind, &metadata),
                Err(e) => step_err(&format!("{}: {}", kind, e)),
            }
        }
    } else {
        println!("  {}", dim("no trained model; run `calhousing train`"));
    }

    if let Some(report) = store.load_report::<TrainingReport>()? {
        section("Last training run");
        println!("  {:<16} {}", muted("Records"), report.n_records);
        println!("  {:<16} {}", muted("Train / test"), format!("{} / {}", report.n_train, report.n_test));
        print_metrics(&report.test_metrics);
        println!("  {:<16} {:.3}s", muted("Time"), report.training_time_secs);
    }

    println!();
    Ok(())
}

fn show_dataset_info(records: &[HousingRecord]) -> anyhow::Result<()> {
    println!("  {:<20} {}", muted("Records"), records.len());
    println!();
    println!("  {:<20} {:>8}", muted("Column"), muted("Missing"));
    println!("  {}", dim(&"─".repeat(30)));
    for column in NumericColumn::ALL {
        let missing = records.iter().filter(|r| r.numeric(column).is_none()).count();
        println!("  {:<20} {:>8}", column.name(), missing);
    }

    let mut categories: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *categories.entry(record.ocean_proximity.as_str()).or_default() += 1;
    }
    println!();
    for (category, count) in &categories {
        println!("  {:<20} {:>8}", category, count);
    }

    println!();
    println!("  {:<20} {:>8}", muted("Income category"), muted("Share"));
    for (category, share) in income_category_proportions(records)? {
        println!("  {:<20} {:>8.4}", category, share);
    }
    Ok(())
}

fn show_artifact_info(kind: ArtifactKind, metadata: &ArtifactMetadata) {
    println!("  {}", kind.to_string().white().bold());
    println!("    {:<14} {}", muted("Name"), metadata.name);
    println!("    {:<14} {}", muted("Version"), metadata.version);
    println!("    {:<14} {}", muted("Trained at"), metadata.trained_at);
    println!("    {:<14} {}", muted("Features"), metadata.feature_names.len());
    for (key, value) in &metadata.hyperparameters {
        println!("    {:<14} {}", muted(key), value);
    }
    for (key, value) in &metadata.metrics {
        println!("    {:<14} {:.4}", muted(key), value);
    }
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "California Housing".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Model  ", "random forest regressor"));
    line_box(&kv("Target ", "median_house_value"));
    line_box_empty();
    line_box_bottom();
    println!();
}

fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("calhousing", "Interactive launcher (default)"),
        ("calhousing fetch", "Download and extract the dataset"),
        ("calhousing train", "Train and save pipeline + model"),
        ("calhousing train -n 30 --max-features sqrt", "Smaller, faster forest"),
        ("calhousing evaluate", "Score the saved model on the test set"),
        ("calhousing predict --median-income 8.3 ...", "Predict one block"),
        ("calhousing info", "Dataset and artifact details"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<44} {}", cmd.white(), muted(desc));
    }

    section("Environment");

    let vars: &[(&str, &str)] = &[
        ("HOUSING_DATA_DIR", "dataset directory"),
        ("HOUSING_MODEL_DIR", "artifact directory"),
        ("HOUSING_URL", "archive URL"),
        ("HOUSING_SEED", "random seed"),
        ("HOUSING_TEST_RATIO", "held-out fraction"),
        ("HOUSING_DOWNLOAD_RETRIES", "download attempts"),
        ("RUST_LOG", "log filter, e.g. calhousing=debug"),
    ];

    for (var, desc) in vars {
        println!("  {:<44} {}", var.truecolor(120, 170, 255), muted(desc));
    }

    println!();
}

pub async fn cmd_interactive(config: &AppConfig) -> anyhow::Result<()> {
    use dialoguer::Select;

    print_banner();
    let theme = prompt::theme();

    loop {
        let items = &[
            "Predict               estimate a block's value",
            "Train                 fetch data, fit and save",
            "Evaluate              score the saved model",
            "Info                  dataset & artifacts",
            "Help                  commands & environment",
            "Exit",
        ];

        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("What would you like to do")
            .items(items)
            .default(0)
            .interact_opt()?;

        // A failed action is reported and the launcher keeps running
        let outcome = match sel {
            Some(0) => cmd_predict(config, &PredictArgs::default()),
            Some(1) => cmd_train(config, &TrainArgs::default()).await,
            Some(2) => cmd_evaluate(config),
            Some(3) => cmd_info(config),
            Some(4) => {
                show_help();
                Ok(())
            }
            Some(5) | None => {
                println!();
                println!("  {}", dim("goodbye"));
                println!();
                break;
            }
            _ => Ok(()),
        };

        if let Err(e) = outcome {
            println!();
            step_err(&format!("{:#}", e));
        }
        wait_enter();
    }

    Ok(())
}

/// Form input from flags only; errors name the first missing field
pub fn form_from_flags(args: &PredictArgs) -> anyhow::Result<FormInput> {
    let mut values = [0.0; 8];
    for ((value, given), column) in values.iter_mut().zip(args.values()).zip(NumericColumn::ALL) {
        *value = given.ok_or_else(|| anyhow::anyhow!("--{} is required", column.name().replace('_', "-")))?;
    }
    let ocean = args
        .ocean_proximity
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--ocean-proximity is required"))?;
    Ok(FormInput::from_values(values, parse_ocean_proximity(ocean)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_features() {
        assert_eq!(parse_max_features("all"), Ok(MaxFeatures::All));
        assert_eq!(parse_max_features("SQRT"), Ok(MaxFeatures::Sqrt));
        assert_eq!(parse_max_features("6"), Ok(MaxFeatures::Fixed(6)));
        assert_eq!(parse_max_features("0.5"), Ok(MaxFeatures::Fraction(0.5)));
        assert!(parse_max_features("1.5").is_err());
        assert!(parse_max_features("many").is_err());
    }

    #[test]
    fn test_cli_parses_predict_flags() {
        let cli = Cli::try_parse_from([
            "calhousing",
            "--model-dir",
            "/tmp/m",
            "predict",
            "--longitude",
            "-122.23",
            "--ocean-proximity",
            "NEAR BAY",
        ])
        .unwrap();

        assert_eq!(cli.global.model_dir, Some(PathBuf::from("/tmp/m")));
        match cli.command {
            Some(Commands::Predict(args)) => {
                assert_eq!(args.longitude, Some(-122.23));
                assert_eq!(args.ocean_proximity.as_deref(), Some("NEAR BAY"));
                assert!(args.latitude.is_none());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_form_from_flags() {
        let mut args = PredictArgs {
            longitude: Some(-122.23),
            latitude: Some(37.88),
            housing_median_age: Some(41.0),
            total_rooms: Some(880.0),
            total_bedrooms: Some(129.0),
            population: Some(322.0),
            households: Some(126.0),
            median_income: Some(8.3252),
            ocean_proximity: Some("NEAR BAY".to_string()),
        };
        let input = form_from_flags(&args).unwrap();
        assert_eq!(input.ocean_proximity, OceanProximity::NearBay);
        assert!(input.validate().is_ok());

        args.households = None;
        let err = form_from_flags(&args).unwrap_err();
        assert!(err.to_string().contains("--households"));

        args.households = Some(126.0);
        args.ocean_proximity = Some("DESERT".to_string());
        assert!(form_from_flags(&args).is_err());
    }

    #[test]
    fn test_global_args_override_config() {
        let args = GlobalArgs {
            data_dir: Some(PathBuf::from("/tmp/d")),
            model_dir: None,
            seed: Some(9),
        };
        let config = args.to_config();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/d"));
        assert_eq!(config.random_state, 9);
    }
}
