use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use serde_json::json;
use std::error::Error;
use std::path::Path;

#[derive(Parser)]
#[command(name = "triage-cli")]
#[command(about = "Triage Engine CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

/// Patient fields shared by the analyze and predict calls
#[derive(Args)]
struct PatientArgs {
    #[arg(long)]
    age: u32,

    #[arg(long, default_value = "female")]
    gender: String,

    /// Blood pressure as "systolic/diastolic"
    #[arg(long, default_value = "120/80")]
    bp: String,

    #[arg(long, default_value = "72")]
    heart_rate: i32,

    #[arg(long, default_value = "98.6")]
    temperature: f64,

    /// Structured symptom, repeatable
    #[arg(short, long)]
    symptom: Vec<String>,

    /// Free-text symptom description
    #[arg(long)]
    symptoms_text: Option<String>,

    /// Known condition, repeatable
    #[arg(short, long)]
    condition: Vec<String>,
}

impl PatientArgs {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "age": self.age,
            "gender": self.gender,
            "bp": self.bp,
            "heart_rate": self.heart_rate,
            "temperature": self.temperature,
            "symptoms": self.symptom,
            "symptoms_text": self.symptoms_text,
            "conditions": self.condition,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full triage pipeline for a patient
    Analyze {
        #[command(flatten)]
        patient: PatientArgs,
    },

    /// Raw classifier prediction with probability breakdowns
    Predict {
        #[command(flatten)]
        patient: PatientArgs,
    },

    /// Show model bundle status
    Status,

    /// Check server health
    Health,

    /// Train classifier artifacts locally from synthetic records
    Train {
        /// Output directory for model artifacts
        #[arg(short, long, default_value = "models")]
        out_dir: String,

        /// Number of synthetic records
        #[arg(long)]
        samples: Option<usize>,

        /// Generator seed
        #[arg(long)]
        seed: Option<u64>,

        /// Trees per forest
        #[arg(long)]
        trees: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Analyze { patient } => {
            let response = client
                .post(format!("{}/v1/triage/analyze", cli.endpoint))
                .json(&patient.to_json())
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Predict { patient } => {
            let response = client
                .post(format!("{}/v1/triage/predict", cli.endpoint))
                .json(&patient.to_json())
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Status => {
            let response = client
                .get(format!("{}/v1/models/status", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Train {
            out_dir,
            samples,
            seed,
            trees,
        } => {
            let mut training = triage_engine::config::TrainingConfig::default();
            if let Some(samples) = samples {
                training.samples = samples;
            }
            if let Some(seed) = seed {
                training.seed = seed;
            }
            if let Some(trees) = trees {
                training.trees = trees;
            }

            println!(
                "Training triage classifiers: {} samples, {} trees, seed {}",
                training.samples, training.trees, training.seed
            );

            let report =
                triage_engine::ml::training::train_and_save(&training, Path::new(&out_dir))?;

            println!("Artifacts written to {}/", out_dir);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
