//! Core types shared by the document, diff, writer and translation layers.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Quantity → text for one `<plurals>` group.
pub type QuantityMap = BTreeMap<QuantityCategory, String>;

/// The plural quantities Android accepts on `<item quantity="...">`.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Copy, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl QuantityCategory {
    pub const ALL: [QuantityCategory; 6] = [
        QuantityCategory::Zero,
        QuantityCategory::One,
        QuantityCategory::Two,
        QuantityCategory::Few,
        QuantityCategory::Many,
        QuantityCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuantityCategory::Zero => "zero",
            QuantityCategory::One => "one",
            QuantityCategory::Two => "two",
            QuantityCategory::Few => "few",
            QuantityCategory::Many => "many",
            QuantityCategory::Other => "other",
        }
    }
}

impl Display for QuantityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantityCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(QuantityCategory::Zero),
            "one" => Ok(QuantityCategory::One),
            "two" => Ok(QuantityCategory::Two),
            "few" => Ok(QuantityCategory::Few),
            "many" => Ok(QuantityCategory::Many),
            "other" => Ok(QuantityCategory::Other),
            _ => Err(Error::UnknownQuantity(s.to_string())),
        }
    }
}

/// Language of a resource document, derived from its `values*` directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(into = "String", from = "String")]
pub enum Language {
    /// The base language, stored under plain `values/`.
    Default,
    /// A translation, stored under `values-<qualifier>/`.
    Locale(String),
}

impl Language {
    pub const DEFAULT_TAG: &'static str = "default";

    pub fn is_default(&self) -> bool {
        matches!(self, Language::Default)
    }

    /// The qualifier as written in the directory name (`"default"` for the base language).
    pub fn as_str(&self) -> &str {
        match self {
            Language::Default => Self::DEFAULT_TAG,
            Language::Locale(code) => code,
        }
    }

    /// Detects the language from a resource directory name.
    ///
    /// `values` is the default language; `values-es`, `values-zh-rCN` and
    /// `values-b+sr+Latn` carry a qualifier. Qualifiers that are not locales
    /// (`values-night`, `values-v21`) are rejected.
    pub fn from_values_dir(dir_name: &str) -> Result<Self, Error> {
        if dir_name == "values" {
            return Ok(Language::Default);
        }
        let qualifier = dir_name
            .strip_prefix("values-")
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::InvalidLanguage(dir_name.to_string()))?;
        if !crate::language::is_locale_qualifier(qualifier) {
            return Err(Error::InvalidLanguage(dir_name.to_string()));
        }
        Ok(Language::Locale(qualifier.to_string()))
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        if value == Language::DEFAULT_TAG {
            Language::Default
        } else {
            Language::Locale(value)
        }
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Language::from(value.to_string())
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_from_str() {
        assert_eq!(
            QuantityCategory::from_str("zero").unwrap(),
            QuantityCategory::Zero
        );
        assert_eq!(
            QuantityCategory::from_str("OTHER").unwrap(),
            QuantityCategory::Other
        );
        assert_eq!(
            QuantityCategory::from_str(" few ").unwrap(),
            QuantityCategory::Few
        );
    }

    #[test]
    fn test_quantity_from_str_invalid() {
        let err = QuantityCategory::from_str("several").unwrap_err();
        assert!(matches!(err, Error::UnknownQuantity(ref q) if q == "several"));
    }

    #[test]
    fn test_quantity_order_matches_cldr_order() {
        let mut shuffled = vec![
            QuantityCategory::Other,
            QuantityCategory::One,
            QuantityCategory::Many,
            QuantityCategory::Zero,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                QuantityCategory::Zero,
                QuantityCategory::One,
                QuantityCategory::Many,
                QuantityCategory::Other,
            ]
        );
    }

    #[test]
    fn test_quantity_display_roundtrips() {
        for category in QuantityCategory::ALL {
            assert_eq!(
                QuantityCategory::from_str(&category.to_string()).unwrap(),
                category
            );
        }
    }

    #[test]
    fn test_language_from_values_dir() {
        assert_eq!(Language::from_values_dir("values").unwrap(), Language::Default);
        assert_eq!(
            Language::from_values_dir("values-es").unwrap(),
            Language::Locale("es".to_string())
        );
        assert_eq!(
            Language::from_values_dir("values-zh-rCN").unwrap(),
            Language::Locale("zh-rCN".to_string())
        );
        assert_eq!(
            Language::from_values_dir("values-b+sr+Latn").unwrap(),
            Language::Locale("b+sr+Latn".to_string())
        );
    }

    #[test]
    fn test_language_from_values_dir_rejects_other_qualifiers() {
        assert!(Language::from_values_dir("values-night").is_err());
        assert!(Language::from_values_dir("values-v21").is_err());
        assert!(Language::from_values_dir("values-sw600dp").is_err());
        assert!(Language::from_values_dir("values-").is_err());
        assert!(Language::from_values_dir("valuesx").is_err());
    }

    #[test]
    fn test_language_serde_as_string() {
        let json = serde_json::to_string(&Language::Default).unwrap();
        assert_eq!(json, "\"default\"");
        let parsed: Language = serde_json::from_str("\"pt-rBR\"").unwrap();
        assert_eq!(parsed, Language::Locale("pt-rBR".to_string()));
    }
}
