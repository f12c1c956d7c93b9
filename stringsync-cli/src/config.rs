//! Run settings from command-line flags, GitHub Actions inputs and an
//! optional TOML file.
//!
//! Precedence is flag (or action input) > config file > built-in default.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use stringsync::{
    ScanOptions, TranslateOptions, scan_options::DEFAULT_FILE_NAME,
    translate::DEFAULT_REFERENCE_CONTEXT_LIMIT,
};

use crate::{
    cli::Args,
    llm::{DEFAULT_MODEL, LlmConfig, Provider},
};

pub const DEFAULT_CONFIG_FILE: &str = "stringsync.toml";

/// Lookup of environment variables, injectable for tests.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    pub paths: Vec<PathBuf>,
    pub ignore_folders: Vec<String>,
    pub use_gitignore: Option<bool>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationSection {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub project_context: Option<String>,
    pub include_reference_context: Option<bool>,
    pub reference_context_limit: Option<i64>,
    pub keep_going: Option<bool>,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    pub send_site_info: Option<bool>,
}

/// Contents of `stringsync.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub dry_run: Option<bool>,
    pub log_trace: Option<bool>,
    pub scan: ScanSection,
    pub translation: TranslationSection,
}

impl FileConfig {
    /// Parses a config file. Relative scan paths are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config file {}: {}", path.display(), e))?;
        let mut config: FileConfig = toml::from_str(&text)
            .map_err(|e| format!("Invalid config file {}: {}", path.display(), e))?;
        if let Some(dir) = path.parent() {
            config.scan.paths = config
                .scan
                .paths
                .into_iter()
                .map(|p| if p.is_relative() { dir.join(p) } else { p })
                .collect();
        }
        Ok(config)
    }

    /// Loads `explicit`, or `./stringsync.toml` when it exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<(PathBuf, Self)>, String> {
        match explicit {
            Some(path) => Ok(Some((path.to_path_buf(), Self::load(path)?))),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    let config = Self::load(&default)?;
                    Ok(Some((default, config)))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

/// Where the parameters of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    CommandLine,
    Environment,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub origin: Origin,
    pub config_file: Option<PathBuf>,
    pub resources_paths: Vec<PathBuf>,
    pub dry_run: bool,
    pub log_trace: bool,
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    pub send_site_info: bool,
    pub project_context: Option<String>,
    pub ignore_folders: Vec<String>,
    pub use_gitignore: bool,
    pub file_name: String,
    pub include_reference_context: bool,
    pub reference_context_limit: usize,
    pub keep_going: bool,
    pub report_json: Option<PathBuf>,
    /// File named by `GITHUB_OUTPUT`, where the report is appended.
    pub github_output: Option<PathBuf>,
    /// Messages produced while resolving, logged once logging is set up.
    pub notices: Vec<String>,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_flag(env: EnvLookup, name: &str) -> Option<bool> {
    env(name).map(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Translates GitHub Actions `INPUT_*` variables into command-line arguments.
fn args_from_env(env: EnvLookup, notices: &mut Vec<String>) -> Args {
    let reference_context_limit = env("INPUT_REFERENCE_CONTEXT_LIMIT").and_then(|raw| {
        match raw.trim().parse::<i64>() {
            Ok(limit) => Some(limit),
            Err(_) => {
                notices.push(format!(
                    "Invalid INPUT_REFERENCE_CONTEXT_LIMIT value ('{}'); falling back to {}",
                    raw, DEFAULT_REFERENCE_CONTEXT_LIMIT
                ));
                None
            }
        }
    });
    let llm_provider = env("INPUT_LLM_PROVIDER").and_then(|raw| match raw.parse::<Provider>() {
        Ok(provider) => Some(provider),
        Err(e) => {
            notices.push(e);
            None
        }
    });
    let include = env_flag(env, "INPUT_INCLUDE_REFERENCE_CONTEXT");

    Args {
        resources_paths: env("INPUT_RESOURCES_PATHS")
            .map(|raw| split_list(&raw).into_iter().map(PathBuf::from).collect())
            .unwrap_or_default(),
        dry_run: env_flag(env, "INPUT_DRY_RUN").unwrap_or(false),
        log_trace: env_flag(env, "INPUT_LOG_TRACE").unwrap_or(false),
        llm_provider,
        model: non_empty(env("INPUT_MODEL")).or_else(|| non_empty(env("INPUT_OPENAI_MODEL"))),
        openrouter_site_url: non_empty(env("INPUT_OPENROUTER_SITE_URL")),
        openrouter_site_name: non_empty(env("INPUT_OPENROUTER_SITE_NAME")),
        no_openrouter_send_site_info: env_flag(env, "INPUT_OPENROUTER_SEND_SITE_INFO")
            == Some(false),
        project_context: non_empty(env("INPUT_PROJECT_CONTEXT")),
        ignore_folders: non_empty(env("INPUT_IGNORE_FOLDERS")),
        include_reference_context: include == Some(true),
        no_include_reference_context: include == Some(false),
        reference_context_limit,
        ..Args::default()
    }
}

impl Settings {
    /// Resolves settings for this process: action inputs when running under
    /// GitHub Actions, command-line flags otherwise.
    pub fn resolve(args: Args, env: EnvLookup) -> Result<Self, String> {
        let github = env("GITHUB_ACTIONS").is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let mut notices = Vec::new();
        let (args, origin) = if github {
            let mut from_env = args_from_env(env, &mut notices);
            from_env.config = args.config;
            from_env.report_json = args.report_json;
            (from_env, Origin::Environment)
        } else {
            (args, Origin::CommandLine)
        };
        let config = FileConfig::discover(args.config.as_deref())?;
        Ok(Self::merge(args, config, origin, env, notices))
    }

    fn merge(
        args: Args,
        config: Option<(PathBuf, FileConfig)>,
        origin: Origin,
        env: EnvLookup,
        mut notices: Vec<String>,
    ) -> Self {
        let reference_context_flag = args.reference_context_flag();
        let (config_file, file) = match config {
            Some((path, file)) => (Some(path), file),
            None => (None, FileConfig::default()),
        };
        let scan = file.scan;
        let translation = file.translation;

        let provider = args
            .llm_provider
            .or(translation.provider)
            .unwrap_or_default();

        let api_key = match provider {
            Provider::OpenRouter => {
                let fallback = match origin {
                    Origin::Environment => non_empty(env("OPENAI_API_KEY")),
                    Origin::CommandLine => None,
                };
                non_empty(args.openrouter_api_key)
                    .or_else(|| non_empty(env(provider.api_key_env())))
                    .or(fallback)
            }
            Provider::OpenAi => {
                non_empty(args.openai_api_key).or_else(|| non_empty(env(provider.api_key_env())))
            }
        };

        let mut reference_context_limit = args
            .reference_context_limit
            .or(translation.reference_context_limit)
            .unwrap_or(DEFAULT_REFERENCE_CONTEXT_LIMIT as i64);
        if reference_context_limit < 0 {
            notices.push(format!(
                "Reference context limit {} is negative; resetting to 0 (disables context).",
                reference_context_limit
            ));
            reference_context_limit = 0;
        }
        let include_reference_context = reference_context_flag
            .or(translation.include_reference_context)
            .unwrap_or(true)
            && reference_context_limit > 0;

        let ignore_folders = match args.ignore_folders {
            Some(raw) => split_list(&raw),
            None => scan.ignore_folders,
        };

        Settings {
            origin,
            config_file,
            resources_paths: if args.resources_paths.is_empty() {
                scan.paths
            } else {
                args.resources_paths
            },
            dry_run: args.dry_run || file.dry_run.unwrap_or(false),
            log_trace: args.log_trace || file.log_trace.unwrap_or(false),
            provider,
            // The deprecated flag wins, as it did when it was the only option.
            model: non_empty(args.openai_model)
                .or(non_empty(args.model))
                .or(non_empty(translation.model))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            base_url: non_empty(args.api_base_url).or(non_empty(translation.base_url)),
            site_url: args.openrouter_site_url.or(translation.site_url),
            site_name: args.openrouter_site_name.or(translation.site_name),
            send_site_info: !args.no_openrouter_send_site_info
                && translation.send_site_info.unwrap_or(true),
            project_context: non_empty(args.project_context)
                .or(non_empty(translation.project_context)),
            ignore_folders,
            use_gitignore: !args.no_gitignore && scan.use_gitignore.unwrap_or(true),
            file_name: args
                .file_name
                .or(scan.file_name)
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            include_reference_context,
            reference_context_limit: reference_context_limit as usize,
            keep_going: args.keep_going || translation.keep_going.unwrap_or(false),
            report_json: args.report_json,
            github_output: non_empty(env("GITHUB_OUTPUT")).map(PathBuf::from),
            notices,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::new()
            .with_file_name(self.file_name.clone())
            .with_ignore_folders(self.ignore_folders.clone())
            .with_pattern_files(self.use_gitignore)
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions::new()
            .with_project_context(self.project_context.clone())
            .with_reference_context(
                self.include_reference_context,
                self.reference_context_limit,
            )
            .with_keep_going(self.keep_going)
    }

    /// Provider configuration, `None` without an API key.
    pub fn llm_config(&self) -> Option<LlmConfig> {
        let api_key = self.api_key.clone()?;
        let openrouter = self.provider == Provider::OpenRouter;
        Some(LlmConfig {
            provider: self.provider,
            api_key,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            site_url: self.site_url.clone().filter(|_| openrouter),
            site_name: self.site_name.clone().filter(|_| openrouter),
            send_site_info: self.send_site_info,
        })
    }

    /// One-line summary of the run parameters, without secrets.
    pub fn describe(&self) -> String {
        let prefix = match self.origin {
            Origin::CommandLine => "Running with command-line parameters.",
            Origin::Environment => "Running with parameters from environment variables.",
        };
        let paths: Vec<String> = self
            .resources_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!(
            "{} Resources Paths: [{}], Dry Run: {}, Log Trace: {}, LLM Provider: {}, Model: {}, \
             Project Context: {}, Ignore Folders: [{}], Include Reference Context: {}, \
             Reference Context Limit: {}",
            prefix,
            paths.join(", "),
            self.dry_run,
            self.log_trace,
            self.provider.as_str(),
            self.model,
            self.project_context.as_deref().unwrap_or(""),
            self.ignore_folders.join(", "),
            self.include_reference_context,
            self.reference_context_limit
        )
    }
}
