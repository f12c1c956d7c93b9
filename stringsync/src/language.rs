//! Android resource qualifiers (`es`, `zh-rCN`, `b+sr+Latn`) and their English names.

use unic_langid::LanguageIdentifier;

use crate::error::Error;

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("am", "Amharic"),
    ("ar", "Arabic"),
    ("az", "Azerbaijani"),
    ("be", "Belarusian"),
    ("bg", "Bulgarian"),
    ("bn", "Bangla"),
    ("bs", "Bosnian"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("eu", "Basque"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fil", "Filipino"),
    ("fr", "French"),
    ("ga", "Irish"),
    ("gl", "Galician"),
    ("gu", "Gujarati"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("hy", "Armenian"),
    ("id", "Indonesian"),
    ("in", "Indonesian"),
    ("is", "Icelandic"),
    ("it", "Italian"),
    ("iw", "Hebrew"),
    ("ja", "Japanese"),
    ("ka", "Georgian"),
    ("kk", "Kazakh"),
    ("km", "Khmer"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("mk", "Macedonian"),
    ("ml", "Malayalam"),
    ("mn", "Mongolian"),
    ("mr", "Marathi"),
    ("ms", "Malay"),
    ("my", "Burmese"),
    ("nb", "Norwegian Bokmål"),
    ("ne", "Nepali"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pa", "Punjabi"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("si", "Sinhala"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("sq", "Albanian"),
    ("sr", "Serbian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("uz", "Uzbek"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
    ("zu", "Zulu"),
];

const SCRIPT_NAMES: &[(&str, &str)] = &[
    ("Arab", "Arabic"),
    ("Cyrl", "Cyrillic"),
    ("Hans", "Simplified"),
    ("Hant", "Traditional"),
    ("Latn", "Latin"),
];

const REGION_NAMES: &[(&str, &str)] = &[
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("DE", "Germany"),
    ("ES", "Spain"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("HK", "Hong Kong SAR China"),
    ("IE", "Ireland"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("MX", "Mexico"),
    ("MO", "Macao SAR China"),
    ("NL", "Netherlands"),
    ("NZ", "New Zealand"),
    ("PT", "Portugal"),
    ("SG", "Singapore"),
    ("TW", "Taiwan"),
    ("US", "United States"),
    ("419", "Latin America"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(code, _)| *code == key)
        .map(|(_, name)| *name)
}

fn is_primary_subtag(s: &str) -> bool {
    (2..=3).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Rewrites an Android qualifier into BCP 47 form: `zh-rCN` → `zh-CN`, `b+sr+Latn` → `sr-Latn`.
fn to_bcp47(qualifier: &str) -> Option<String> {
    if let Some(rest) = qualifier.strip_prefix("b+") {
        let parts: Vec<&str> = rest.split('+').collect();
        if parts.is_empty() || !is_primary_subtag(parts[0]) {
            return None;
        }
        return Some(parts.join("-"));
    }

    let mut parts = qualifier.split('-');
    let language = parts.next().filter(|p| is_primary_subtag(p))?;
    let mut out = language.to_string();
    for part in parts {
        let region = part.strip_prefix('r').unwrap_or(part);
        out.push('-');
        out.push_str(region);
    }
    Some(out)
}

/// True when `qualifier` (the part after `values-`) names a locale.
pub fn is_locale_qualifier(qualifier: &str) -> bool {
    to_language_identifier(qualifier).is_ok()
}

/// Parses an Android resource qualifier into a [`LanguageIdentifier`].
pub fn to_language_identifier(qualifier: &str) -> Result<LanguageIdentifier, Error> {
    let bcp47 =
        to_bcp47(qualifier).ok_or_else(|| Error::InvalidLanguage(qualifier.to_string()))?;
    bcp47
        .parse::<LanguageIdentifier>()
        .map_err(|_| Error::InvalidLanguage(qualifier.to_string()))
}

/// English display name for a qualifier, e.g. `pt-rBR` → `Portuguese (Brazil)`.
///
/// Falls back to the qualifier itself when the language is unknown.
pub fn display_name(qualifier: &str) -> String {
    if qualifier == crate::types::Language::DEFAULT_TAG {
        return "Default (English)".to_string();
    }

    let Ok(langid) = to_language_identifier(qualifier) else {
        tracing::warn!("Could not determine language name for locale '{}'", qualifier);
        return qualifier.to_string();
    };
    let Some(name) = lookup(LANGUAGE_NAMES, langid.language.as_str()) else {
        tracing::warn!("Could not determine language name for locale '{}'", qualifier);
        return qualifier.to_string();
    };

    let mut details = Vec::new();
    if let Some(script) = langid.script {
        details.push(
            lookup(SCRIPT_NAMES, script.as_str())
                .unwrap_or(script.as_str())
                .to_string(),
        );
    }
    if let Some(region) = langid.region {
        details.push(
            lookup(REGION_NAMES, region.as_str())
                .unwrap_or(region.as_str())
                .to_string(),
        );
    }

    if details.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, details.join(", "))
    }
}
