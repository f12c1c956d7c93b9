use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use serde::Serialize;
use stringsync::{
    MissingReport, TranslationLog, check_missing, render_missing_report,
    render_translation_report, translate_modules,
};

use crate::{
    config::Settings,
    llm::LlmTranslator,
    validation::{missing_api_key_help, validate_settings},
};

/// Heredoc delimiter for the report in `GITHUB_OUTPUT`; unlikely to occur in translations.
pub const REPORT_DELIMITER: &str = "EOF_TRANSLATION_REPORT_9d8e7f6a";

#[derive(Serialize)]
struct JsonReport<'a> {
    translations: &'a TranslationLog,
    missing: &'a MissingReport,
}

/// Appends the report to a GitHub Actions output file as `translation_report`.
pub fn append_github_output(path: &Path, report: &str) -> Result<(), String> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Cannot open {}: {}", path.display(), e))?;
    writeln!(file, "translation_report<<{}", REPORT_DELIMITER)
        .and_then(|_| writeln!(file, "{}", report))
        .and_then(|_| writeln!(file, "{}", REPORT_DELIMITER))
        .map_err(|e| format!("Cannot write {}: {}", path.display(), e))
}

fn write_json_report(
    path: &Path,
    translations: &TranslationLog,
    missing: &MissingReport,
) -> Result<(), String> {
    let payload = JsonReport {
        translations,
        missing,
    };
    let json = serde_json::to_string_pretty(&payload)
        .map_err(|e| format!("Cannot serialize report: {}", e))?;
    fs::write(path, json).map_err(|e| format!("Error writing report: {}", e))?;
    tracing::info!("Wrote JSON report to {}", path.display());
    Ok(())
}

fn publish_report(settings: &Settings, report: &str, missing: &MissingReport) -> Result<(), String> {
    if let Some(path) = &settings.github_output {
        return append_github_output(path, report);
    }
    if settings.dry_run {
        println!("{}", render_missing_report(missing));
    } else {
        println!("\nTranslation Report:");
        println!("{}", report);
    }
    Ok(())
}

/// Scans, translates what is missing (unless dry-run), checks what is still
/// missing and publishes the reports.
///
/// A translation failure is returned only after the reports are published.
pub fn run(settings: &Settings) -> Result<(), String> {
    for notice in &settings.notices {
        tracing::warn!("{}", notice);
    }
    tracing::info!("{}", settings.describe());
    if let Some(path) = &settings.config_file {
        tracing::info!("Using config file {}", path.display());
    }
    validate_settings(settings)?;

    let mut modules = stringsync::scan(&settings.resources_paths, &settings.scan_options())
        .map_err(|e| format!("Error scanning resources: {}", e))?;
    if modules.is_empty() {
        return Err("No resource files found!".to_string());
    }

    let resources_count: usize = modules
        .values()
        .map(|m| m.languages().map(|l| m.documents(l).len()).sum::<usize>())
        .sum();
    tracing::info!(
        "Found {} modules with {} resource files",
        modules.len(),
        resources_count
    );
    if settings.log_trace {
        for module in modules.values() {
            module.log_summary();
        }
    }

    let mut log = TranslationLog::default();
    let mut failure = None;
    if !settings.dry_run {
        let config = settings
            .llm_config()
            .ok_or_else(|| missing_api_key_help(settings.provider))?;
        let translator = LlmTranslator::new(config)
            .map_err(|e| format!("Error creating LLM configuration: {}", e))?;
        tracing::info!(
            "Starting translation using {} with model {}",
            settings.provider.as_str(),
            settings.model
        );
        match translate_modules(
            &mut modules,
            &translator,
            &settings.translate_options(),
            &mut log,
        ) {
            Ok(summary) if summary.failed > 0 => {
                failure = Some(format!(
                    "Translation failed for {} resource files",
                    summary.failed
                ));
            }
            Ok(_) => {}
            Err(e) => failure = Some(format!("Translation failed: {}", e)),
        }
    }

    let missing = check_missing(&modules);
    let report = render_translation_report(&log);
    publish_report(settings, &report, &missing)?;
    if let Some(path) = &settings.report_json {
        write_json_report(path, &log, &missing)?;
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_output_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        fs::write(&path, "other=1\n").unwrap();

        append_github_output(&path, "# Translation Report\n\nNo translations were performed.")
            .unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "other=1\n\
             translation_report<<EOF_TRANSLATION_REPORT_9d8e7f6a\n\
             # Translation Report\n\nNo translations were performed.\n\
             EOF_TRANSLATION_REPORT_9d8e7f6a\n"
        );
    }

    #[test]
    fn test_json_report_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_report(&path, &TranslationLog::default(), &MissingReport::default()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["translations"]["modules"].is_object());
        assert!(value["missing"]["modules"].is_object());
    }
}
