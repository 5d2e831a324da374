use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "xcstrings-translator",
    version,
    about = "Translate iOS .xcstrings catalogs using an LLM completion endpoint"
)]
struct Cli {
    /// Input .xcstrings file to translate
    #[arg(short = 'i', long = "input-file")]
    input_file: String,

    /// Source language code (e.g. "en")
    #[arg(short = 's', long = "source-language-code")]
    source_language_code: String,

    /// Target language code (e.g. "de", "fr")
    #[arg(short = 't', long = "target-language-code")]
    target_language_code: String,

    /// File with app context to embed into the prompt
    #[arg(long = "app-context-path", default_value = "app_context.txt")]
    app_context_path: String,

    /// Word budget per translation chunk (default 30)
    #[arg(long = "chunk-word-size")]
    chunk_word_size: Option<usize>,

    /// Submissions per chunk before giving up on it (default 3)
    #[arg(long = "max-attempts")]
    max_attempts: Option<usize>,

    /// Model identifier (overrides settings)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    xcstrings_translator::logging::init(cli.verbose)?;

    let summary = xcstrings_translator::run(xcstrings_translator::Config {
        input_file: cli.input_file,
        source_lang: cli.source_language_code,
        target_lang: cli.target_language_code,
        app_context_path: cli.app_context_path,
        chunk_word_size: cli.chunk_word_size,
        max_attempts: cli.max_attempts,
        model: cli.model,
        settings_path: cli.read_settings,
    })
    .await?;

    println!("{summary}");
    Ok(())
}
