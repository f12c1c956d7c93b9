//! Missing-translation checks and markdown reports.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write,
};

use serde::{Deserialize, Serialize};

use crate::{
    language::display_name,
    module::{Modules, ResourceModule},
    translate::TranslationLog,
    types::{Language, QuantityCategory},
};

/// What one language of a module lacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingTranslations {
    pub strings: BTreeSet<String>,
    /// Plural name → base quantities the language does not define.
    pub plurals: BTreeMap<String, BTreeSet<QuantityCategory>>,
}

impl MissingTranslations {
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.plurals.is_empty()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.strings.is_empty() {
            let keys: Vec<&str> = self.strings.iter().map(String::as_str).collect();
            parts.push(format!("strings: {}", keys.join(", ")));
        }
        if !self.plurals.is_empty() {
            let plurals: Vec<String> = self
                .plurals
                .iter()
                .map(|(name, quantities)| format!("{}({})", name, join_quantities(quantities)))
                .collect();
            parts.push(format!("plurals: {}", plurals.join(", ")));
        }
        parts.join(" | ")
    }
}

/// Module name → language → missing resources. Complete languages are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingReport {
    pub modules: BTreeMap<String, BTreeMap<Language, MissingTranslations>>,
}

impl MissingReport {
    pub fn is_empty(&self) -> bool {
        self.modules.values().all(BTreeMap::is_empty)
    }
}

fn join_quantities(quantities: &BTreeSet<QuantityCategory>) -> String {
    quantities
        .iter()
        .map(|q| q.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Union of string keys and plural quantities over a set of documents.
fn key_space<'a>(
    documents: impl IntoIterator<Item = &'a crate::document::ResourceDocument>,
) -> (BTreeSet<String>, BTreeMap<String, BTreeSet<QuantityCategory>>) {
    let mut strings = BTreeSet::new();
    let mut plurals: BTreeMap<String, BTreeSet<QuantityCategory>> = BTreeMap::new();
    for document in documents {
        strings.extend(document.entries().keys().cloned());
        for (name, forms) in document.groups() {
            plurals
                .entry(name.clone())
                .or_default()
                .extend(forms.keys().copied());
        }
    }
    (strings, plurals)
}

fn missing_in_module(module: &ResourceModule) -> BTreeMap<Language, MissingTranslations> {
    let (base_strings, base_plurals) = key_space(module.documents(&Language::Default));

    let mut missing = BTreeMap::new();
    for (language, documents) in module.translations() {
        let (strings, plurals) = key_space(documents);
        let mut result = MissingTranslations {
            strings: base_strings.difference(&strings).cloned().collect(),
            plurals: BTreeMap::new(),
        };
        for (name, base_quantities) in &base_plurals {
            let present = plurals.get(name).cloned().unwrap_or_default();
            let lacking: BTreeSet<QuantityCategory> =
                base_quantities.difference(&present).copied().collect();
            if !lacking.is_empty() {
                result.plurals.insert(name.clone(), lacking);
            }
        }
        if !result.is_empty() {
            missing.insert(language.clone(), result);
        }
    }
    missing
}

/// Compares every target language with the union of the module's default
/// resources, down to individual plural quantities, and logs the findings.
pub fn check_missing(modules: &Modules) -> MissingReport {
    tracing::info!("Missing Translations Report");
    let mut report = MissingReport::default();

    for module in modules.values() {
        if module.documents(&Language::Default).is_empty() {
            tracing::warn!("  No default resources for module '{}'", module.name);
            continue;
        }

        let missing = missing_in_module(module);
        if missing.is_empty() {
            continue;
        }
        tracing::info!("Module: {} (has missing translations)", module.name);
        for (language, translations) in &missing {
            tracing::info!("  [{}]: missing {}", language, translations.describe());
        }
        report
            .modules
            .entry(module.name.clone())
            .or_default()
            .extend(missing);
    }

    if report.is_empty() {
        tracing::info!("All translations are complete.");
    }
    report
}

fn flatten(text: &str) -> String {
    text.replace('\n', " ")
}

/// Markdown report of everything translated during a run.
pub fn render_translation_report(log: &TranslationLog) -> String {
    let mut report = String::from("# Translation Report\n\n");
    let mut has_translations = false;

    for (module, languages) in &log.modules {
        let mut section = String::new();
        for (language, details) in languages {
            if details.is_empty() {
                continue;
            }
            let _ = writeln!(section, "### Language: {}\n", display_name(language.as_str()));

            if !details.strings.is_empty() {
                section.push_str("| Key | Source Text | Translated Text |\n");
                section.push_str("| --- | ----------- | --------------- |\n");
                for entry in &details.strings {
                    let _ = writeln!(
                        section,
                        "| {} | {} | {} |",
                        entry.key,
                        flatten(&entry.source),
                        flatten(&entry.translation)
                    );
                }
                section.push('\n');
            }

            if !details.plurals.is_empty() {
                section.push_str("#### Plural Resources\n\n");
                for plural in &details.plurals {
                    let _ = writeln!(section, "**{}**\n", plural.name);
                    section.push_str("| Quantity | Translated Text |\n");
                    section.push_str("| -------- | --------------- |\n");
                    for (quantity, text) in &plural.translations {
                        let _ = writeln!(section, "| {} | {} |", quantity, flatten(text));
                    }
                    section.push('\n');
                }
            }
        }

        if !section.is_empty() {
            has_translations = true;
            let _ = writeln!(report, "## Module: {}\n", module);
            report.push_str(&section);
        }
    }

    if !has_translations {
        report.push_str("No translations were performed.");
    }
    report
}

/// Markdown listing of missing strings and plural quantities.
pub fn render_missing_report(report: &MissingReport) -> String {
    let mut out = String::from("# Missing Translations Report\n\n");
    if report.is_empty() {
        out.push_str("All translations are complete.");
        return out;
    }

    for (module, languages) in &report.modules {
        if languages.is_empty() {
            continue;
        }
        let _ = writeln!(out, "## Module: {}\n", module);
        for (language, missing) in languages {
            let _ = writeln!(out, "### Language: {}\n", display_name(language.as_str()));
            if !missing.strings.is_empty() {
                let keys: Vec<&str> = missing.strings.iter().map(String::as_str).collect();
                let _ = writeln!(out, "- Strings: {}", keys.join(", "));
            }
            for (name, quantities) in &missing.plurals {
                let _ = writeln!(out, "- Plural `{}`: {}", name, join_quantities(quantities));
            }
            out.push('\n');
        }
    }
    out
}
