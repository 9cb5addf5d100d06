use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "wordcanvas",
    version,
    about = "Render synthetic text images for OCR training"
)]
struct Cli {
    /// Text to render (omit with --random-text)
    #[arg(short = 't', long = "text")]
    text: Option<String>,

    /// Number of images to generate
    #[arg(short = 'n', long = "count", default_value_t = 1)]
    count: usize,

    /// Directory receiving the PNG and JSON files
    #[arg(short = 'o', long = "output-dir", default_value = "output")]
    output_dir: PathBuf,

    /// Render machine-readable zones instead: TD1, TD2, TD3 or random
    #[arg(long = "mrz")]
    mrz: Option<String>,

    /// MRZ line (repeat per line, or pass one string joined by the delimiter)
    #[arg(long = "mrz-text")]
    mrz_text: Vec<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Seed for reproducible output
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Font file used when no font bank is in play
    #[arg(long = "font-path")]
    font_path: Option<String>,

    /// Directory of .ttf/.otf fonts for --random-font
    #[arg(long = "font-bank")]
    font_bank: Option<String>,

    /// Fixed output canvas as HEIGHTxWIDTH (e.g. 64x512)
    #[arg(short = 's', long = "output-size")]
    output_size: Option<String>,

    /// Writing direction (ltr, ttb)
    #[arg(short = 'd', long = "direction")]
    direction: Option<String>,

    /// Alignment inside the output canvas (left, right, center, scatter)
    #[arg(short = 'a', long = "align")]
    align_mode: Option<String>,

    /// Final orientation (remain, horizontal, vertical)
    #[arg(long = "output-direction")]
    output_direction: Option<String>,

    /// Randomize direction, colors and alignment
    #[arg(long = "enable-all-random")]
    enable_all_random: bool,

    /// Draw a font from the font bank per image
    #[arg(long = "random-font")]
    random_font: bool,

    /// Weight the font draw by character coverage (needs --random-font and --random-text)
    #[arg(long = "random-font-weight")]
    random_font_weight: bool,

    /// Draw random text from the font's characters
    #[arg(long = "random-text")]
    random_text: bool,

    /// Randomize the writing direction
    #[arg(long = "random-direction")]
    random_direction: bool,

    /// Randomize the text color
    #[arg(long = "random-text-color")]
    random_text_color: bool,

    /// Randomize the background color
    #[arg(long = "random-background-color")]
    random_background_color: bool,

    /// Randomize the alignment
    #[arg(long = "random-align")]
    random_align_mode: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    wordcanvas::logging::init(cli.verbose)?;

    let config = wordcanvas::Config {
        text: cli.text,
        count: cli.count,
        output_dir: cli.output_dir,
        mrz: cli.mrz,
        mrz_text: cli.mrz_text,
        settings_path: cli.read_settings,
        seed: cli.seed,
        font_path: cli.font_path,
        font_bank: cli.font_bank,
        output_size: cli.output_size,
        direction: cli.direction,
        align_mode: cli.align_mode,
        output_direction: cli.output_direction,
        enable_all_random: cli.enable_all_random,
        random_font: cli.random_font,
        random_font_weight: cli.random_font_weight,
        random_text: cli.random_text,
        random_direction: cli.random_direction,
        random_text_color: cli.random_text_color,
        random_background_color: cli.random_background_color,
        random_align_mode: cli.random_align_mode,
    };

    for path in wordcanvas::run(config)? {
        println!("{}", path.display());
    }
    Ok(())
}
