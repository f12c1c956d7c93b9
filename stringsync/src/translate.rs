//! Drives translation of missing resources and merges results into documents.
//!
//! For every target document the diff against the module baseline is
//! computed, each missing entry and pending plural group is sent to the
//! [`Translator`], the result is escaped against the base text and merged,
//! and the document is flushed. Already merged work is flushed even when a
//! later translation fails.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    diff::{DiffResult, diff},
    document::{Baseline, ResourceDocument},
    error::Error,
    escape::escape,
    language::display_name,
    module::Modules,
    traits::{PluralReferenceExample, ReferenceExample, TranslationContext, Translator},
    types::{Language, QuantityCategory, QuantityMap},
    writer,
};

pub const DEFAULT_REFERENCE_CONTEXT_LIMIT: usize = 25;

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub project_context: Option<String>,
    pub include_reference_context: bool,
    /// Maximum number of reference examples per kind; 0 disables them.
    pub reference_context_limit: usize,
    /// Continue with the next document after a failure instead of stopping.
    pub keep_going: bool,
    /// Where log events of the run go. `None` uses the caller's default subscriber.
    pub dispatch: Option<tracing::Dispatch>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            project_context: None,
            include_reference_context: true,
            reference_context_limit: DEFAULT_REFERENCE_CONTEXT_LIMIT,
            keep_going: false,
            dispatch: None,
        }
    }
}

impl TranslateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_context(mut self, project_context: Option<String>) -> Self {
        self.project_context = project_context;
        self
    }

    pub fn with_reference_context(mut self, include: bool, limit: usize) -> Self {
        self.include_reference_context = include;
        self.reference_context_limit = limit;
        self
    }

    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn with_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    fn reference_limit(&self) -> usize {
        if self.include_reference_context {
            self.reference_context_limit
        } else {
            0
        }
    }

    /// Runs `f` with this run's log dispatcher installed, if any.
    fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRecord {
    pub key: String,
    pub source: String,
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluralRecord {
    pub name: String,
    /// The group as stored after merging.
    pub translations: QuantityMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageLog {
    pub strings: Vec<StringRecord>,
    pub plurals: Vec<PluralRecord>,
}

impl LanguageLog {
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.plurals.is_empty()
    }

    /// Number of translated strings plus translated plural quantities.
    pub fn count(&self) -> usize {
        self.strings.len()
            + self
                .plurals
                .iter()
                .map(|p| p.translations.len())
                .sum::<usize>()
    }
}

/// Everything applied during a run: module name → language → records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationLog {
    pub modules: BTreeMap<String, BTreeMap<Language, LanguageLog>>,
}

impl TranslationLog {
    pub fn is_empty(&self) -> bool {
        self.modules
            .values()
            .all(|languages| languages.values().all(LanguageLog::is_empty))
    }

    pub fn count(&self) -> usize {
        self.modules
            .values()
            .flat_map(|languages| languages.values())
            .map(LanguageLog::count)
            .sum()
    }

    pub fn language_mut(&mut self, module: &str, language: &Language) -> &mut LanguageLog {
        self.modules
            .entry(module.to_string())
            .or_default()
            .entry(language.clone())
            .or_default()
    }

    /// Logs which keys were translated, per language.
    pub fn log_summary(&self) {
        if self.count() == 0 {
            tracing::info!("No translations needed");
            return;
        }

        let mut per_language: BTreeMap<&Language, (BTreeSet<&str>, BTreeSet<&str>)> =
            BTreeMap::new();
        for languages in self.modules.values() {
            for (language, log) in languages {
                let (strings, plurals) = per_language.entry(language).or_default();
                strings.extend(log.strings.iter().map(|s| s.key.as_str()));
                plurals.extend(log.plurals.iter().map(|p| p.name.as_str()));
            }
        }

        for (language, (strings, plurals)) in per_language {
            if strings.is_empty() && plurals.is_empty() {
                continue;
            }
            let mut parts = vec![format!("Language '{}':", language)];
            if !strings.is_empty() {
                parts.push(format!(
                    "Strings translated: {}",
                    strings.into_iter().collect::<Vec<_>>().join(", ")
                ));
            }
            if !plurals.is_empty() {
                parts.push(format!(
                    "Plurals translated: {}",
                    plurals.into_iter().collect::<Vec<_>>().join(", ")
                ));
            }
            tracing::info!("{}", parts.join(" "));
        }
    }
}

/// Outcome counters of [`translate_modules`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationSummary {
    pub translated: usize,
    /// Documents whose translation failed (only with `keep_going`).
    pub failed: usize,
}

/// Existing translations of keys that are not being translated now, sorted by key.
fn reference_examples(
    document: &ResourceDocument,
    baseline: &Baseline,
    pending: &BTreeSet<&str>,
    limit: usize,
) -> (Vec<ReferenceExample>, Vec<PluralReferenceExample>) {
    if limit == 0 {
        return (Vec::new(), Vec::new());
    }

    let strings = document
        .entries()
        .iter()
        .filter(|(key, _)| !pending.contains(key.as_str()))
        .filter_map(|(key, translation)| {
            let source = baseline.entries.get(key)?;
            (!source.is_empty() && !translation.is_empty()).then(|| ReferenceExample {
                key: key.clone(),
                source: source.clone(),
                translation: translation.clone(),
            })
        })
        .take(limit)
        .collect();

    let plurals = document
        .groups()
        .iter()
        .filter(|(name, _)| !pending.contains(name.as_str()))
        .filter_map(|(name, translation)| {
            let source = baseline.groups.get(name)?;
            (!source.is_empty() && !translation.is_empty()).then(|| PluralReferenceExample {
                name: name.clone(),
                source: source.clone(),
                translation: translation.clone(),
            })
        })
        .take(limit)
        .collect();

    (strings, plurals)
}

fn apply_translations<T: Translator + ?Sized>(
    document: &mut ResourceDocument,
    baseline: &Baseline,
    pending: &DiffResult,
    translator: &T,
    options: &TranslateOptions,
    log: &mut LanguageLog,
) -> Result<(), Error> {
    let language = document.language().clone();
    let language_name = display_name(language.as_str());
    let (examples, plural_examples) = reference_examples(
        document,
        baseline,
        &pending.pending_keys(),
        options.reference_limit(),
    );
    let context_for = |key: &str| {
        TranslationContext::new(key)
            .with_project_context(options.project_context.clone())
            .with_reference_examples(examples.clone())
            .with_plural_examples(plural_examples.clone())
    };

    let mut to_translate: Vec<(&String, &String)> = Vec::new();
    for key in &pending.missing_entries {
        match baseline.entries.get(key) {
            Some(source) if !source.trim().is_empty() => to_translate.push((key, source)),
            _ => document.set_entry(key.clone(), ""),
        }
    }

    if !to_translate.is_empty() {
        tracing::info!("Translating {} strings for {}", to_translate.len(), language);
    }
    for (key, source) in to_translate {
        let translated = translator
            .translate_entry(source, &language_name, &context_for(key.as_str()))
            .inspect_err(|e| tracing::error!("Error translating string '{}': {}", key, e))?;
        let escaped = escape(&translated, Some(source.as_str()));
        tracing::info!(
            "Translated string '{}' to {}: '{}' -> '{}'",
            key,
            language,
            source,
            escaped
        );
        document.set_entry(key.clone(), escaped.clone());
        log.strings.push(StringRecord {
            key: key.clone(),
            source: source.clone(),
            translation: escaped,
        });
    }

    if !pending.missing_groups.is_empty() {
        tracing::info!(
            "Translating {} plurals for {}",
            pending.missing_groups.len(),
            language
        );
    }
    for (name, forms) in &pending.missing_groups {
        let generated = translator
            .translate_group(forms, &language_name, &context_for(name.as_str()))
            .inspect_err(|e| tracing::error!("Error translating plural '{}': {}", name, e))?;
        if generated.is_empty() {
            return Err(Error::translation(name, "translator returned no plural forms"));
        }
        if !generated.contains_key(&QuantityCategory::Other) {
            tracing::warn!(
                "Plural '{}' for {} has no 'other' form",
                name,
                language
            );
        }

        let escaped: QuantityMap = generated
            .into_iter()
            .map(|(quantity, text)| {
                let reference = forms
                    .get(&quantity)
                    .or_else(|| forms.get(&QuantityCategory::Other))
                    .map(String::as_str);
                (quantity, escape(&text, reference))
            })
            .collect();

        let merged = document.merge_group(name, escaped).clone();
        tracing::info!(
            "Translated plural group '{}' for language '{}': {:?}",
            name,
            language,
            merged
        );
        log.plurals.push(PluralRecord {
            name: name.clone(),
            translations: merged,
        });
    }
    Ok(())
}

/// Translates what `document` lacks compared with `baseline` and writes it back.
///
/// The document is flushed even when a translation fails, so everything
/// merged before the failure is kept; the failure is then returned.
pub fn translate_document<T: Translator + ?Sized>(
    document: &mut ResourceDocument,
    baseline: &Baseline,
    translator: &T,
    options: &TranslateOptions,
    log: &mut LanguageLog,
) -> Result<(), Error> {
    options.in_scope(|| {
        let pending = diff(baseline, document);
        if pending.is_empty() {
            return Ok(());
        }

        let outcome = apply_translations(document, baseline, &pending, translator, options, log);
        match writer::flush(document) {
            Ok(_) => outcome,
            Err(flush_error) => match outcome {
                Ok(()) => Err(flush_error),
                Err(e) => {
                    tracing::error!(
                        "Could not save partial translations to {}: {}",
                        document.path().display(),
                        flush_error
                    );
                    Err(e)
                }
            },
        }
    })
}

/// Translates every target document of every module.
///
/// Modules without a default-language document are skipped with a warning.
/// Without `keep_going` the first failure stops the run; `log` keeps what
/// was applied up to that point.
pub fn translate_modules<T: Translator + ?Sized>(
    modules: &mut Modules,
    translator: &T,
    options: &TranslateOptions,
    log: &mut TranslationLog,
) -> Result<TranslationSummary, Error> {
    options.in_scope(|| {
        let mut summary = TranslationSummary::default();
        for module in modules.values_mut() {
            let Some(baseline) = module.baseline() else {
                tracing::warn!(
                    "Module '{}' missing default resources; skipping auto translation.",
                    module.name
                );
                continue;
            };

            let module_name = module.name.clone();
            for (language, documents) in module.translations_mut() {
                let language_log = log.language_mut(&module_name, language);
                for document in documents.iter_mut() {
                    tracing::info!(
                        "Auto-translating missing resources for module '{}', language '{}'",
                        module_name,
                        language
                    );
                    let before = language_log.count();
                    let result =
                        translate_document(document, &baseline, translator, options, language_log);
                    summary.translated += language_log.count() - before;
                    if let Err(e) = result {
                        if !options.keep_going {
                            return Err(e);
                        }
                        tracing::error!(
                            "Translation of {} failed, continuing: {}",
                            document.path().display(),
                            e
                        );
                        summary.failed += 1;
                    }
                }
            }
        }
        log.log_summary();
        Ok(summary)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Language;
    use std::{
        cell::RefCell,
        fs,
        sync::{Arc, Mutex},
    };

    /// Prefixes text with the language name and records every request.
    #[derive(Default)]
    struct EchoTranslator {
        contexts: RefCell<Vec<TranslationContext>>,
        fail_on: Option<&'static str>,
    }

    impl Translator for EchoTranslator {
        fn translate_entry(
            &self,
            text: &str,
            language_name: &str,
            context: &TranslationContext,
        ) -> Result<String, Error> {
            self.contexts.borrow_mut().push(context.clone());
            if self.fail_on == Some(context.key.as_str()) {
                return Err(Error::translation(&context.key, "service unavailable"));
            }
            Ok(format!("[{}] {}", language_name, text))
        }

        fn translate_group(
            &self,
            forms: &QuantityMap,
            language_name: &str,
            context: &TranslationContext,
        ) -> Result<QuantityMap, Error> {
            self.contexts.borrow_mut().push(context.clone());
            Ok(forms
                .iter()
                .map(|(q, text)| (*q, format!("[{}] {}", language_name, text)))
                .collect())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        baseline: Baseline,
        target: ResourceDocument,
    }

    fn fixture(base: &str, target: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let base_doc =
            ResourceDocument::parse_str("values/strings.xml", Language::Default, base).unwrap();
        let path = dir.path().join("strings.xml");
        fs::write(&path, target).unwrap();
        let target = ResourceDocument::load(&path, Language::from("es")).unwrap();
        Fixture {
            _dir: dir,
            baseline: Baseline::from_documents([&base_doc]),
            target,
        }
    }

    #[test]
    fn test_translates_missing_entries_and_flushes() {
        let mut f = fixture(
            r#"<resources><string name="hello">Hello</string><string name="bye">Bye</string><string name="blank"> </string></resources>"#,
            "<resources>\n    <string name=\"hello\">Hola</string>\n</resources>\n",
        );
        let translator = EchoTranslator::default();
        let mut log = LanguageLog::default();

        translate_document(
            &mut f.target,
            &f.baseline,
            &translator,
            &TranslateOptions::new(),
            &mut log,
        )
        .unwrap();

        assert!(!f.target.is_dirty());
        assert_eq!(f.target.entry("bye"), Some("[Spanish] Bye"));
        assert_eq!(f.target.entry("blank"), Some(""));
        assert_eq!(log.strings.len(), 1);
        assert_eq!(log.strings[0].source, "Bye");

        let written = fs::read_to_string(f.target.path()).unwrap();
        assert!(written.contains("<string name=\"hello\">Hola</string>"));
        assert!(written.contains("<string name=\"bye\">[Spanish] Bye</string>"));
        assert!(written.contains("<string name=\"blank\"></string>"));
    }

    #[test]
    fn test_reference_examples_exclude_pending_keys() {
        let mut f = fixture(
            r#"<resources><string name="a">A</string><string name="b">B</string><string name="c">C</string></resources>"#,
            r#"<resources><string name="a">Aa</string><string name="b">Bb</string></resources>"#,
        );
        let translator = EchoTranslator::default();
        let options = TranslateOptions::new()
            .with_project_context(Some("A todo app".to_string()))
            .with_reference_context(true, 1);
        translate_document(
            &mut f.target,
            &f.baseline,
            &translator,
            &options,
            &mut LanguageLog::default(),
        )
        .unwrap();

        let contexts = translator.contexts.borrow();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].key, "c");
        assert_eq!(contexts[0].project_context.as_deref(), Some("A todo app"));
        assert_eq!(
            contexts[0].reference_examples,
            vec![ReferenceExample {
                key: "a".to_string(),
                source: "A".to_string(),
                translation: "Aa".to_string(),
            }]
        );
    }

    #[test]
    fn test_reference_context_disabled() {
        let mut f = fixture(
            r#"<resources><string name="a">A</string><string name="c">C</string></resources>"#,
            r#"<resources><string name="a">Aa</string></resources>"#,
        );
        let translator = EchoTranslator::default();
        let options = TranslateOptions::new().with_reference_context(true, 0);
        translate_document(
            &mut f.target,
            &f.baseline,
            &translator,
            &options,
            &mut LanguageLog::default(),
        )
        .unwrap();
        assert!(translator.contexts.borrow()[0].reference_examples.is_empty());
    }

    #[test]
    fn test_group_merge_keeps_existing_forms() {
        let mut f = fixture(
            r#"<resources><plurals name="days"><item quantity="one">%d day</item><item quantity="other">%d days</item></plurals></resources>"#,
            "<resources>\n    <plurals name=\"days\">\n        <item quantity=\"other\">dies</item>\n    </plurals>\n</resources>\n",
        );
        let mut log = LanguageLog::default();
        translate_document(
            &mut f.target,
            &f.baseline,
            &EchoTranslator::default(),
            &TranslateOptions::new(),
            &mut log,
        )
        .unwrap();

        let days = f.target.group("days").unwrap();
        assert_eq!(days[&QuantityCategory::One], "[Spanish] %d day");
        assert_eq!(days[&QuantityCategory::Other], "dies");
        assert_eq!(log.plurals[0].translations, *days);
        assert_eq!(log.count(), 2);
    }

    #[test]
    fn test_failure_still_flushes_merged_work() {
        let mut f = fixture(
            r#"<resources><string name="a">A</string><string name="b">B</string></resources>"#,
            "<resources>\n</resources>\n",
        );
        let translator = EchoTranslator {
            fail_on: Some("b"),
            ..Default::default()
        };
        let mut log = LanguageLog::default();
        let err = translate_document(
            &mut f.target,
            &f.baseline,
            &translator,
            &TranslateOptions::new(),
            &mut log,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Translation { ref key, .. } if key == "b"));
        let written = fs::read_to_string(f.target.path()).unwrap();
        assert!(written.contains("<string name=\"a\">[Spanish] A</string>"));
        assert!(!written.contains("name=\"b\""));
        assert_eq!(log.strings.len(), 1);
    }

    #[test]
    fn test_empty_group_result_is_an_error() {
        struct Silent;
        impl Translator for Silent {
            fn translate_entry(
                &self,
                text: &str,
                _: &str,
                _: &TranslationContext,
            ) -> Result<String, Error> {
                Ok(text.to_string())
            }
            fn translate_group(
                &self,
                _: &QuantityMap,
                _: &str,
                _: &TranslationContext,
            ) -> Result<QuantityMap, Error> {
                Ok(QuantityMap::new())
            }
        }

        let mut f = fixture(
            r#"<resources><plurals name="days"><item quantity="other">%d days</item></plurals></resources>"#,
            "<resources/>",
        );
        let err = translate_document(
            &mut f.target,
            &f.baseline,
            &Silent,
            &TranslateOptions::new(),
            &mut LanguageLog::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no plural forms"));
    }

    #[test]
    fn test_logs_go_to_the_configured_dispatch() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer_buffer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || BufferWriter(writer_buffer.clone()))
            .finish();
        let options = TranslateOptions::new().with_dispatch(tracing::Dispatch::new(subscriber));

        let mut f = fixture(
            r#"<resources><string name="bye">Bye</string></resources>"#,
            "<resources/>",
        );
        translate_document(
            &mut f.target,
            &f.baseline,
            &EchoTranslator::default(),
            &options,
            &mut LanguageLog::default(),
        )
        .unwrap();

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Translated string 'bye' to es"));
        assert!(output.contains("Updated XML file"));
    }

    struct BufferWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for BufferWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_translation_log_summary_counts() {
        let mut log = TranslationLog::default();
        assert!(log.is_empty());
        let es = log.language_mut("app", &Language::from("es"));
        es.strings.push(StringRecord {
            key: "a".to_string(),
            source: "A".to_string(),
            translation: "Aa".to_string(),
        });
        assert_eq!(log.count(), 1);
        assert!(!log.is_empty());

        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"es\""));
        let back: TranslationLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
