use std::path::Path;

use crate::{config::Settings, llm::Provider};

/// Validate a resource path exists
pub fn validate_resource_path(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!(
            "The specified path {} does not exist!",
            path.display()
        ));
    }
    Ok(())
}

/// Validate output directory exists or can be created
pub fn validate_output_path(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return Err(format!("Cannot create output directory: {}", e));
            }
        }
    }
    Ok(())
}

/// Help shown when translation is requested without an API key.
pub fn missing_api_key_help(provider: Provider) -> String {
    let env_var = provider.api_key_env();
    let keys_url = match provider {
        Provider::OpenRouter => "https://openrouter.ai/keys",
        Provider::OpenAi => "https://platform.openai.com/api-keys",
    };
    format!(
        "API key not found!\n\
         Translation is enabled (not in dry-run mode) but no API key was provided.\n\n\
         To fix this:\n\
         1. For GitHub Actions, add {env_var} to your repository secrets and pass it via env in your workflow:\n\
         \x20    env:\n\
         \x20      {env_var}: ${{{{ secrets.{env_var} }}}}\n\
         2. For local execution, set the environment variable:\n\
         \x20    export {env_var}=your_key_here\n\
         3. Or pass it as a command-line argument:\n\
         \x20    --{provider}-api-key YOUR_KEY\n\n\
         Get your API key at: {keys_url}",
        provider = provider.as_str(),
    )
}

/// Validate everything a run needs before touching any file
pub fn validate_settings(settings: &Settings) -> Result<(), String> {
    if !settings.dry_run && settings.api_key.is_none() {
        return Err(missing_api_key_help(settings.provider));
    }

    if settings.resources_paths.is_empty() {
        return Err("No resources paths provided".to_string());
    }
    for path in &settings.resources_paths {
        validate_resource_path(path)?;
    }

    if settings.file_name.trim().is_empty() {
        return Err("Resource file name cannot be empty".to_string());
    }

    if let Some(ref report) = settings.report_json {
        validate_output_path(report)
            .map_err(|e| format!("Report output validation failed: {}", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::path::PathBuf;

    fn settings(argv: &[&str]) -> Settings {
        let args =
            Args::try_parse_from(std::iter::once("stringsync").chain(argv.iter().copied())).unwrap();
        Settings::resolve(args, &|_: &str| -> Option<String> { None }).unwrap()
    }

    #[test]
    fn test_api_key_required_unless_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let err = validate_settings(&settings(&[root])).unwrap_err();
        assert!(err.contains("OPENROUTER_API_KEY"));
        assert!(err.contains("--openrouter-api-key"));

        assert!(validate_settings(&settings(&[root, "--dry-run"])).is_ok());
        assert!(validate_settings(&settings(&[root, "--openrouter-api-key", "k"])).is_ok());
    }

    #[test]
    fn test_missing_path() {
        let err = validate_settings(&settings(&["--dry-run", "/definitely/not/here"])).unwrap_err();
        assert!(err.contains("does not exist"));
        assert!(validate_settings(&settings(&["--dry-run"])).is_err());
    }

    #[test]
    fn test_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("reports/nested/report.json");
        validate_output_path(&report).unwrap();
        assert!(report.parent().unwrap().is_dir());
        assert!(validate_output_path(&PathBuf::from("report.json")).is_ok());
    }
}
