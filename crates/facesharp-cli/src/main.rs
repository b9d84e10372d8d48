use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facesharp_core::{AnalysisResult, FaceAnalyzer};
use facesharp_detect::MeshDetector;

#[derive(Parser)]
#[command(name = "facesharp", about = "FaceSharp face quality analysis CLI")]
struct Cli {
    /// Path to the face-mesh ONNX model (defaults to the model directory).
    #[arg(long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single image file
    Analyze {
        path: PathBuf,
        /// Emit the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze every file in a directory
    Batch {
        dir: PathBuf,
        /// Emit one JSON result per line
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let model_path = cli
        .model
        .unwrap_or_else(facesharp_detect::default_model_path);
    let detector = MeshDetector::load(&model_path)
        .with_context(|| format!("loading face-mesh model from {model_path}"))?;
    let mut analyzer = FaceAnalyzer::new(Box::new(detector));

    match cli.command {
        Commands::Analyze { path, json } => {
            let result = analyzer.analyze_file(&path);
            print_result(&path, &result, json)?;
        }
        Commands::Batch { dir, json } => {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)
                .with_context(|| format!("reading directory {}", dir.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file())
                .collect();
            entries.sort();

            for path in entries {
                let result = analyzer.analyze_file(&path);
                print_result(&path, &result, json)?;
            }
        }
    }

    Ok(())
}

fn print_result(path: &Path, result: &AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(result)?);
        return Ok(());
    }

    println!(
        "{}: {} (confidence {:.2}{})",
        path.display(),
        result.label,
        result.confidence,
        if result.abstain { ", abstained" } else { "" }
    );
    if let Some(axes) = &result.axes {
        println!(
            "  sharpness {:.1}  lighting {:.1}  pose {:.1}  jawline {:.1}  contrast {:.1}",
            axes.sharpness, axes.lighting, axes.pose, axes.jawline, axes.contrast
        );
    }
    for reason in &result.reasons {
        println!("  - {reason}");
    }
    Ok(())
}
