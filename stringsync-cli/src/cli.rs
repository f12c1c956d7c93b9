use std::path::PathBuf;

use clap::Parser;

use crate::llm::Provider;

/// Report missing Android string translations and fill them in with an LLM.
#[derive(Parser, Debug, Default)]
#[command(name = "stringsync", author, version, about, long_about = None)]
pub struct Args {
    /// Paths to Android project directories with resource files
    pub resources_paths: Vec<PathBuf>,

    /// Only report missing translations without translating
    #[arg(short, long)]
    pub dry_run: bool,

    /// Log detailed trace information
    #[arg(short, long)]
    pub log_trace: bool,

    /// TOML configuration file (defaults to ./stringsync.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// LLM provider to use [default: openrouter]
    #[arg(long, value_enum)]
    pub llm_provider: Option<Provider>,

    /// Model to use for translation [default: google/gemini-2.5-flash-preview-09-2025]
    #[arg(long)]
    pub model: Option<String>,

    /// Deprecated alias of --model
    #[arg(long, hide = true)]
    pub openai_model: Option<String>,

    /// OpenAI API key (falls back to OPENAI_API_KEY)
    #[arg(long)]
    pub openai_api_key: Option<String>,

    /// OpenRouter API key (falls back to OPENROUTER_API_KEY)
    #[arg(long)]
    pub openrouter_api_key: Option<String>,

    /// Override the provider's API base URL
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Site URL sent to OpenRouter for rankings
    #[arg(long)]
    pub openrouter_site_url: Option<String>,

    /// Site name sent to OpenRouter for rankings
    #[arg(long)]
    pub openrouter_site_name: Option<String>,

    /// Do not send site URL and name to OpenRouter
    #[arg(long)]
    pub no_openrouter_send_site_info: bool,

    /// Additional project context for translation prompts
    #[arg(long)]
    pub project_context: Option<String>,

    /// Comma separated folder names to ignore; when empty, .gitignore patterns are used
    #[arg(long)]
    pub ignore_folders: Option<String>,

    /// Do not consult .gitignore files while scanning
    #[arg(long)]
    pub no_gitignore: bool,

    /// Name of the resource files to scan for [default: strings.xml]
    #[arg(long)]
    pub file_name: Option<String>,

    /// Include existing translations as context for the LLM (default)
    #[arg(long, overrides_with = "no_include_reference_context")]
    pub include_reference_context: bool,

    /// Do not send existing translations as context
    #[arg(long, overrides_with = "include_reference_context")]
    pub no_include_reference_context: bool,

    /// Maximum number of existing translations sent as context; 0 disables it
    #[arg(long, allow_negative_numbers = true)]
    pub reference_context_limit: Option<i64>,

    /// Continue with the next file when a translation fails
    #[arg(long)]
    pub keep_going: bool,

    /// Write the translation log and missing report as JSON to this file
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

impl Args {
    /// The reference-context switch, if given on the command line.
    pub fn reference_context_flag(&self) -> Option<bool> {
        if self.no_include_reference_context {
            Some(false)
        } else if self.include_reference_context {
            Some(true)
        } else {
            None
        }
    }
}
