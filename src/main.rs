use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lumen_config::{JourneyType, Preferences, Tier};
use lumen_dispatch::{AnalysisResult, Dispatcher};
use lumen_flows::{
  Algorithm, Flow, FlowRunner, GuidedAnalysisFlow, GuidedAnalysisType, JoinFlow, JoinType,
  MlAnalysisFlow, MlAnalysisType, PaymentFlow, PiiDecision, PiiDecisionFlow, TrialUploadFlow,
  UpgradeFlow, render_blocks, render_text,
};

mod settings;

use settings::Settings;

/// Lumen - drive analysis, upload and billing workflows against a Lumen server
#[derive(Parser)]
#[command(name = "lumen")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the config file (default: <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Path to the data directory (default: ~/.lumen)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Backend base URL, overrides the config file
  #[arg(long, global = true, env = "LUMEN_BASE_URL")]
  base_url: Option<String>,

  /// Bearer token, overrides the config file
  #[arg(long, global = true, env = "LUMEN_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Print raw JSON results instead of rendered text
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// List the analyses the ML service offers
  AnalysisTypes,

  /// Join a project's dataset with other datasets
  Join {
    /// The current project
    #[arg(long)]
    project: String,

    /// Dataset to join with (repeatable)
    #[arg(long = "with", required = true)]
    with: Vec<String>,

    /// inner, left, right or outer
    #[arg(long)]
    join_type: JoinType,

    /// Join column per dataset as ID=COLUMN (repeatable)
    #[arg(long = "key", value_parser = parse_pair)]
    keys: Vec<(String, String)>,
  },

  /// Run an ML analysis
  Analyze {
    #[arg(long)]
    project: String,

    /// regression, classification, clustering or anomaly
    #[arg(long = "type")]
    analysis_type: MlAnalysisType,

    /// Target column for regression and classification
    #[arg(long)]
    target: Option<String>,

    /// Feature column (repeatable, default: every numeric column)
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Extra parameter as KEY=VALUE; VALUE is read as JSON when it parses (repeatable)
    #[arg(long = "param", value_parser = parse_pair)]
    params: Vec<(String, String)>,
  },

  /// Run a guided step-by-step analysis
  Guided {
    #[arg(long)]
    project: String,

    /// What the analysis should find out
    #[arg(long)]
    goal: String,

    /// anova, ancova, regression, machine_learning or comprehensive
    #[arg(long = "type")]
    analysis_type: GuidedAnalysisType,

    /// Dependent variable (target for machine_learning)
    #[arg(long)]
    target: Option<String>,

    /// Independent variable (repeatable)
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Business question (repeatable)
    #[arg(long = "question")]
    questions: Vec<String>,

    /// random_forest or linear (machine_learning only)
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// Share of rows held out for testing (machine_learning only)
    #[arg(long)]
    test_size: Option<f64>,

    /// Cross-validation folds (machine_learning only)
    #[arg(long)]
    cross_validation: Option<u32>,
  },

  /// Upload a file on the free trial
  Trial {
    /// CSV, JSON or Excel file
    file: PathBuf,

    /// Project name (default: the file name)
    #[arg(long)]
    name: Option<String>,

    /// Business question (repeatable)
    #[arg(long = "question")]
    questions: Vec<String>,

    /// What to do if the server finds PII: include or exclude
    #[arg(long)]
    pii: Option<PiiDecision>,

    /// Column to drop when excluding PII (repeatable, default: all detected)
    #[arg(long = "exclude-column")]
    exclude_columns: Vec<String>,
  },

  /// Create a payment intent for one analysis
  Pay {
    #[arg(long)]
    project: String,

    #[arg(long = "type")]
    analysis_type: String,

    /// Number of records to analyze
    #[arg(long)]
    records: u64,

    /// The tier the account is on now
    #[arg(long, default_value = "trial")]
    tier: Tier,
  },

  /// Change subscription tier
  Upgrade {
    /// trial, starter, professional or enterprise
    #[arg(long)]
    tier: Tier,

    /// The tier the account is on now
    #[arg(long, default_value = "trial")]
    current: Tier,
  },

  /// Show or set the onboarding journey
  Journey {
    #[command(subcommand)]
    action: JourneyAction,
  },
}

#[derive(Subcommand)]
enum JourneyAction {
  /// Print the saved journey
  Show,

  /// Save a journey
  Set {
    /// ai-guided, template-based, self-service or consultation
    journey: JourneyType,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lumen=info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let Some(command) = cli.command else {
    println!("lumen - use --help to see available commands");
    return Ok(());
  };

  let settings = Settings::resolve(cli.data_dir, cli.config, cli.base_url, cli.token)?;

  match command {
    Commands::Journey { action } => run_journey(&settings, action),
    command => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_command(&settings, command, cli.json).await })
    }
  }
}

fn run_journey(settings: &Settings, action: JourneyAction) -> Result<()> {
  let path = settings.preferences_path();
  let mut prefs = Preferences::load(&path)
    .with_context(|| format!("failed to read preferences: {}", path.display()))?;

  match action {
    JourneyAction::Show => match prefs.journey {
      Some(journey) => println!("{}", journey),
      None => println!("no journey selected"),
    },
    JourneyAction::Set { journey } => {
      prefs.journey = Some(journey);
      prefs
        .save(&path)
        .with_context(|| format!("failed to write preferences: {}", path.display()))?;
      eprintln!("Journey set to {}", journey);
    }
  }

  Ok(())
}

async fn run_command(settings: &Settings, command: Commands, json: bool) -> Result<()> {
  let config = &settings.config;
  let dispatcher =
    Arc::new(Dispatcher::from_config(config).context("failed to set up HTTP client")?);
  if !dispatcher.has_token() {
    tracing::debug!("no token configured, requests are sent unauthenticated");
  }

  // Ctrl-C cancels the in-flight request.
  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_interrupt.cancel();
    }
  });

  match command {
    Commands::AnalysisTypes => {
      let types = dispatcher
        .fetch_analysis_types(&cancel)
        .await
        .context("failed to fetch analysis types")?;
      if json {
        println!("{}", serde_json::to_string_pretty(&types)?);
      } else {
        for t in types {
          let target = if t.requires_target { " (needs target)" } else { "" };
          println!("{:<16} {}{}", t.id, t.name, target);
          if !t.description.is_empty() {
            println!("{:<16} {}", "", t.description);
          }
        }
      }
    }

    Commands::Join {
      project,
      with,
      join_type,
      keys,
    } => {
      let mut runner = new_runner(JoinFlow::new(project), &dispatcher, &cancel)?;
      runner.update(|r| {
        for dataset in with {
          r.select(dataset);
        }
        r.join_type = Some(join_type);
        for (dataset, column) in keys {
          r.set_key(dataset, column);
        }
      });
      let result = submit(&mut runner).await?;
      print_result(&result, json)?;
    }

    Commands::Analyze {
      project,
      analysis_type,
      target,
      features,
      params,
    } => {
      let mut runner = new_runner(MlAnalysisFlow::new(project), &dispatcher, &cancel)?;
      runner.update(|r| {
        r.analysis_type = Some(analysis_type);
        r.target_column = target;
        r.features = features;
        r.parameters = parameters(params);
      });
      let result = submit(&mut runner).await?;
      print_result(&result, json)?;
    }

    Commands::Guided {
      project,
      goal,
      analysis_type,
      target,
      features,
      questions,
      algorithm,
      test_size,
      cross_validation,
    } => {
      let mut runner = new_runner(GuidedAnalysisFlow::new(project), &dispatcher, &cancel)?;
      runner.update(|r| {
        r.goal = goal;
        r.analysis_type = Some(analysis_type);
        r.target = target;
        r.features = features;
        r.questions = questions;
        if let Some(algorithm) = algorithm {
          r.algorithm = algorithm;
        }
        if let Some(test_size) = test_size {
          r.test_size = test_size;
        }
        if let Some(folds) = cross_validation {
          r.cross_validation = folds;
        }
      });
      let result = submit(&mut runner).await?;
      print_result(&result, json)?;
    }

    Commands::Trial {
      file,
      name,
      questions,
      pii,
      exclude_columns,
    } => {
      let flow = TrialUploadFlow::new(config.limits(Tier::Trial));
      let artifact = flow
        .open(&file)
        .await
        .with_context(|| format!("cannot upload {}", file.display()))?;

      let mut upload = new_runner(flow, &dispatcher, &cancel)?;
      upload.update(|r| {
        r.artifact = Some(artifact);
        r.name = name;
        r.questions = questions;
      });
      let uploaded = submit(&mut upload).await?;

      let Some(temp_file_id) = TrialUploadFlow::pending_pii_decision(&uploaded) else {
        print_result(&uploaded, json)?;
        return Ok(());
      };

      let Some(decision) = pii else {
        print_result(&uploaded, json)?;
        bail!(
          "the server found personal data in {}; rerun with --pii include or --pii exclude",
          file.display()
        );
      };

      eprintln!("Personal data detected, sending decision: {}", decision);
      let flow = PiiDecisionFlow::new(temp_file_id, config.pii_decision_timeout());
      let mut decide = new_runner(flow, &dispatcher, &cancel)?;
      decide.update(|r| {
        r.decision = Some(decision);
        r.excluded_columns = exclude_columns;
      });
      let result = submit(&mut decide).await?;
      print_result(&result, json)?;
    }

    Commands::Pay {
      project,
      analysis_type,
      records,
      tier,
    } => {
      let flow = PaymentFlow::new(project, config.limits(tier));
      let mut runner = new_runner(flow, &dispatcher, &cancel)?;
      runner.update(|r| {
        r.analysis_type = Some(analysis_type);
        r.record_count = records;
      });
      let result = submit(&mut runner).await?;
      print_result(&result, json)?;
    }

    Commands::Upgrade { tier, current } => {
      let mut runner = new_runner(UpgradeFlow::new(current), &dispatcher, &cancel)?;
      runner.update(|r| r.tier = Some(tier));
      let result = submit(&mut runner).await?;
      print_result(&result, json)?;
    }

    Commands::Journey { action } => run_journey(settings, action)?,
  }

  Ok(())
}

fn new_runner<F: Flow>(
  flow: F,
  dispatcher: &Arc<Dispatcher>,
  cancel: &CancellationToken,
) -> Result<FlowRunner<F>> {
  let name = flow.name();
  let runner = FlowRunner::new(flow, Arc::clone(dispatcher))
    .with_context(|| format!("failed to set up {} flow", name))?
    .with_cancellation(cancel.clone());
  Ok(runner)
}

async fn submit<F: Flow>(runner: &mut FlowRunner<F>) -> Result<AnalysisResult> {
  let name = runner.flow().name();
  let run_id = runner.run_id().to_string();
  runner
    .drive_to_terminal()
    .with_context(|| format!("{} is missing input", name))?;
  runner
    .submit()
    .await
    .with_context(|| format!("{} failed (run {})", name, run_id))
}

fn print_result(result: &AnalysisResult, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(result.as_value())?);
    return Ok(());
  }

  let text = render_text(&render_blocks(result));
  if text.is_empty() {
    println!("done");
  } else {
    print!("{}", text);
  }
  Ok(())
}

/// Split `KEY=VALUE`.
fn parse_pair(s: &str) -> Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
      Ok((key.trim().to_string(), value.trim().to_string()))
    }
    _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
  }
}

/// Parameter values are JSON when they parse (`3`, `true`, `[1,2]`), plain
/// strings otherwise.
fn parameters(pairs: Vec<(String, String)>) -> Map<String, Value> {
  pairs
    .into_iter()
    .map(|(key, raw)| {
      let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
      (key, value)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_pair() {
    assert_eq!(
      parse_pair("p2=customer_id").unwrap(),
      ("p2".to_string(), "customer_id".to_string())
    );
    assert!(parse_pair("p2").is_err());
    assert!(parse_pair("=id").is_err());
  }

  #[test]
  fn test_parameters_prefer_json() {
    let params = parameters(vec![
      ("n_clusters".to_string(), "4".to_string()),
      ("scale".to_string(), "true".to_string()),
      ("method".to_string(), "kmeans".to_string()),
    ]);
    assert_eq!(params["n_clusters"], 4);
    assert_eq!(params["scale"], true);
    assert_eq!(params["method"], "kmeans");
  }

  #[test]
  fn test_cli_parses_join() {
    let cli = Cli::try_parse_from([
      "lumen",
      "join",
      "--project",
      "p1",
      "--with",
      "p2",
      "--join-type",
      "inner",
      "--key",
      "p1=customer_id",
      "--key",
      "p2=customer_id",
    ])
    .unwrap();

    match cli.command {
      Some(Commands::Join {
        project,
        with,
        join_type,
        keys,
      }) => {
        assert_eq!(project, "p1");
        assert_eq!(with, vec!["p2"]);
        assert_eq!(join_type, JoinType::Inner);
        assert_eq!(keys.len(), 2);
      }
      _ => panic!("expected join command"),
    }
  }

  #[test]
  fn test_cli_pay_tier_defaults_to_trial() {
    let args = ["lumen", "pay", "--project", "p7", "--type", "regression", "--records", "500"];
    match Cli::try_parse_from(args).unwrap().command {
      Some(Commands::Pay { records, tier, .. }) => {
        assert_eq!(records, 500);
        assert_eq!(tier, Tier::Trial);
      }
      _ => panic!("expected pay command"),
    }

    let cli = Cli::try_parse_from(args.into_iter().chain(["--tier", "enterprise"])).unwrap();
    assert!(matches!(
      cli.command,
      Some(Commands::Pay {
        tier: Tier::Enterprise,
        ..
      })
    ));
  }

  #[test]
  fn test_cli_analyze_without_features() {
    let cli = Cli::try_parse_from([
      "lumen", "analyze", "--project", "p1", "--type", "anomaly",
    ])
    .unwrap();
    assert!(matches!(cli.command, Some(Commands::Analyze { .. })));
  }

  #[test]
  fn test_cli_rejects_unknown_tier() {
    assert!(Cli::try_parse_from(["lumen", "upgrade", "--tier", "platinum"]).is_err());
  }
}
