//! Traits at the two seams of stringsync: reading/writing resource files and
//! translating missing text.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{error::Error, types::QuantityMap};

/// A trait for parsing one resource file.
///
/// # Example
///
/// ```rust,no_run
/// use stringsync::{traits::Parser, xml::XmlTree};
/// let tree = XmlTree::read_from("app/src/main/res/values/strings.xml")?;
/// println!("{}", tree.to_xml_string());
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse from any reader of UTF-8 text.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path. A byte order mark selects the encoding (UTF-16
    /// files are decoded) and is dropped; files without one are read as UTF-8.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let file = File::open(path)?;
        let decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .build(file);
        Self::from_reader(BufReader::new(decoder))
    }
}

/// An existing translation shown to the translator for tone and terminology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceExample {
    pub key: String,
    pub source: String,
    pub translation: String,
}

/// An existing plural translation shown to the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluralReferenceExample {
    pub name: String,
    pub source: QuantityMap,
    pub translation: QuantityMap,
}

/// Everything a translator may use besides the text itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationContext {
    /// Key of the resource being translated.
    pub key: String,
    /// Free-form description of the project, if configured.
    pub project_context: Option<String>,
    pub reference_examples: Vec<ReferenceExample>,
    pub plural_examples: Vec<PluralReferenceExample>,
}

impl TranslationContext {
    pub fn new(key: impl Into<String>) -> Self {
        TranslationContext {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_project_context(mut self, project_context: Option<String>) -> Self {
        self.project_context = project_context.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_reference_examples(mut self, reference_examples: Vec<ReferenceExample>) -> Self {
        self.reference_examples = reference_examples;
        self
    }

    pub fn with_plural_examples(mut self, plural_examples: Vec<PluralReferenceExample>) -> Self {
        self.plural_examples = plural_examples;
        self
    }
}

/// The translation collaborator.
///
/// Implementations receive base-language text and return the translation in
/// `language_name` (an English display name such as `"Spanish (Mexico)"`).
/// Returned text is escaped by the caller, implementations should return it
/// as plain resource content.
pub trait Translator {
    fn translate_entry(
        &self,
        text: &str,
        language_name: &str,
        context: &TranslationContext,
    ) -> Result<String, Error>;

    /// Translates every quantity of a plural group. The result may carry a
    /// different set of quantities than `forms`, as the target language needs.
    fn translate_group(
        &self,
        forms: &QuantityMap,
        language_name: &str,
        context: &TranslationContext,
    ) -> Result<QuantityMap, Error>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate_entry(
        &self,
        text: &str,
        language_name: &str,
        context: &TranslationContext,
    ) -> Result<String, Error> {
        (**self).translate_entry(text, language_name, context)
    }

    fn translate_group(
        &self,
        forms: &QuantityMap,
        language_name: &str,
        context: &TranslationContext,
    ) -> Result<QuantityMap, Error> {
        (**self).translate_group(forms, language_name, context)
    }
}
