use clap::Parser;
use rust_manga_translator::config::Config;
use rust_manga_translator::debug::run_debug;
use rust_manga_translator::logging;
use rust_manga_translator::ocr::TesseractOcr;
use rust_manga_translator::translate::GoogleTranslator;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "chapter-debug")]
#[command(about = "Inspect a chapter image directory and preview OCR + translation", long_about = None)]
struct Cli {
    /// Chapter directory containing the downloaded images
    dir: PathBuf,

    /// Target language code
    #[arg(short, long, default_value = "de")]
    target: String,

    /// Source language code for OCR and translation
    #[arg(short, long, default_value = "auto")]
    source: String,

    /// Tesseract executable (overrides config.toml and TESSERACT_CMD)
    #[arg(long)]
    tesseract_cmd: Option<String>,
}

/// Shorten `text` to at most `max` characters for console output
fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init(Path::new("log4rs.yml"));
    let cli = Cli::parse();

    let mut cfg = Config::load();
    if let Some(cmd) = cli.tesseract_cmd {
        cfg.ocr.tesseract_cmd = cmd;
    }

    let ocr = TesseractOcr::new(cfg.ocr.tesseract_cmd.clone());
    let translator = match GoogleTranslator::from_config(&cfg.translation) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to create translation client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_debug(&cli.dir, &ocr, &translator, &cli.source, &cli.target).await {
        Ok(report) => {
            println!("Done. Summary saved to: {}", report.summary.display());
            if let (Some(ocr_text), Some(translated)) = (&report.ocr_text, &report.translated) {
                println!("OCR sample:\n{}", preview(ocr_text, 400));
                println!("Translation sample:\n{}", preview(translated, 400));
            }
            match &report.preview {
                Some(p) => println!("Preview PDF: {}", p.display()),
                None => println!("Preview PDF: not created"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
