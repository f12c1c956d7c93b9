//! Prompt text sent to the translation model.

use serde_json::json;
use stringsync::{
    QuantityMap,
    traits::{PluralReferenceExample, ReferenceExample, TranslationContext},
};

pub const TRANSLATION_GUIDELINES: &str = r#"Follow these guidelines carefully.
**Purpose & Context:**
This translation is for an Android application's UI. Use concise, clear language consistent with standard Android UI conventions. Do not alter the intended meaning of the text.

**Formatting & Structure:**
- Keep all placeholders (e.g., %d, %s, %1$s, %1$d) exactly as in the source. If the target language requires reordering, ensure that the same placeholders appear and are correctly positioned according to the language's syntax.
- Maintain the integrity of HTML, CDATA, or XML structures; translate only the textual content.
- Preserve all whitespace, line breaks, and XML formatting exactly as in the source.
- Escape apostrophes with a backslash (\') as required by Android.

**Handling Line Breaks:**
When translating phrases with line breaks (e.g., "Temporary\nUnblock"):
1. Read the entire phrase to understand its complete meaning
2. Translate the complete phrase into the target language
3. Apply the line break in the translation if it maintains similar meaning
4. Only omit the line break if it doesn't make sense in the target language

**System Terms:**
Do not translate system state words (e.g., WARNING, FAILED, SUCCESS) or any technical and branded terms. Always leave these in their original English, uppercase form.

**Terminology & Natural Expressions:**
Translate in a natural, concise style that matches standard Android UI conventions.
Avoid overly literal translations that may sound awkward. When a technical term or proper noun is more recognizable in English for that language, keep it in English.

**Technical Term Adoption:**
For tech-specific terms that are commonly borrowed in the target language (such as "scrolling", etc.), use the borrowed term if it's more widely recognized than the native equivalent. For Portuguese (Portugal) specifically, terms like "scrolling" can be kept in English when they're commonly used that way in technology contexts.

**Handling Idioms and Metaphors:**
For idiomatic expressions or culturally-charged phrases, that there's no direct equivalent, translate the intended meaning rather than literally. For example, phrases like "brain rot" if there's no direct translation should be translated to convey "mental decay" in a way that sounds natural in the target language.
Make sure to keep the translation within a reasonable size, not exceeding 20% of the original text length. If the translation is significantly longer, and if possible consider rephrasing or simplifying it while maintaining the original meaning.

**Tone and Formality Consistency:**
  Maintain consistent formality throughout ALL translations based on these principles:
- Default to a conversational but respectful tone appropriate for a consumer android app
- Match the formality level commonly used in popular, well-localized android apps in the target language
- Use direct address forms (equivalent to "you" in English) that feel natural in the target language

**Technical Terms:**
Terms like 'accessibility service' and app-specific features should be translated using standard UI terminology in the target language.

**Examples (Portuguese of Portugal):**
- "Message Sent" → ✅ "Mensagem enviada" (❌ "Mensagem foi enviada")
- "Upload Speed" → ✅ "Velocidade de upload" (❌ "Velocidade de envio")
- "Endless scrolling" → ✅ "Scroll sem fim" (❌ "Deslocamento infinito")
- "Temporary\nUnblock" → ✅ "Desbloquear\nTemporariamente" (❌ "Temporário
Desbloquear") (Note that in Portuguese the word order is reversed as per grammar rules)

Learn from the examples above and apply the same principles to other translations.

**Dialect and Regional Vocabulary:**
Unless otherwise specified, use always the vocabulary appropriate to the target dialect (e.g., **pt -> Português de Portugal**) and avoid terms from other variants.

**Brand Names and Proper Nouns:**
All brand names (like GitHub, Android, Google), proper nouns, feature names, and trademarked terms MUST remain in their original English form with exact spelling.
Do not apply any grammatical inflections, declensions, or case modifications to these terms in any language, even when the target language's grammar would typically require it. For example, "GitHub" must always remain "GitHub" - never "GitHubie", "GitHuba", etc.

**Quality Verification:**
After completing translation:
1. Verify no characters from other writing systems have been accidentally included
2. Ensure consistent terminology is used throughout
3. Check that idiomatic expressions are natural in the target language
4. Verify translation accuracy
5. Confirm that the formality level is appropriate and consistent
6. Verify all rules and guidelines have been followed!

**IMPORTANT Output Requirements:**
Return ONLY the final translated text as a single plain line! Preserving only any required formatting from the source.
Do not include the surrounding Android XML structure (<string> tags, etc.). Only output the translated content!
Example:
  Input: "Welcome, <b>%1$s</b>! You have %2$d points."
  Correct output: "Dobrodošli, <b>%1$s</b>! Imate %2$d poena."
  INCORRECT output: "<string name="welcome_message">Dobrodošli, <b>%1$s</b>! Imate %2$d poena.</string>"
"#;

pub const PLURAL_GUIDELINES_ADDITION: &str = r#"For plural resources, follow these guidelines:
1. **Plural Keys:**
   If the source resource contains only a single plural key (e.g., "other") but the target language requires multiple forms, include all necessary plural keys as defined by the target language's pluralization rules.
   *Example:* If the English source has `"other": "%d day left"`, the target translation should include all required forms:
   - `"zero"`: "No days left"
   - `"one"`: "%d day left"
   - `"few"`: "%d days left"
   - `"many"`: "%d days left"
   - `"other"`: "%d days left"
   (Adjust the text according to correct singular and plural usage in the target language. Use the appropriate plural keys for the target language: zero, one, two, few, many, and other.)
"#;

const REFERENCE_CONTEXT_HEADER: &str = "**Existing Translations (reference only):**
These resources of the same app are already translated. Keep terminology and tone consistent with them; do not translate them again.
";

/// System message naming the target language, with the project context appended.
pub fn system_message(language_name: &str, project_context: Option<&str>) -> String {
    let mut message = format!(
        "You are a professional translator translating textual UI elements within an Android from English into {}. Follow user guidelines closely.\n",
        language_name
    );
    if let Some(context) = project_context {
        message.push_str(&format!("\nProject context: {}", context));
    }
    message
}

fn translate_final_text(language_name: &str) -> String {
    format!(
        "Translate the following string provided after the dashed line to language: {}\n----------\n",
        language_name
    )
}

fn string_reference_section(examples: &[ReferenceExample]) -> Option<String> {
    if examples.is_empty() {
        return None;
    }
    let items: Vec<_> = examples
        .iter()
        .map(|e| {
            json!({
                "key": e.key,
                "source": e.source,
                "existing_translation": e.translation,
            })
        })
        .collect();
    Some(format!(
        "{}{}\n\n",
        REFERENCE_CONTEXT_HEADER,
        serde_json::to_string_pretty(&items).ok()?
    ))
}

fn plural_reference_section(examples: &[PluralReferenceExample]) -> Option<String> {
    if examples.is_empty() {
        return None;
    }
    let items: Vec<_> = examples
        .iter()
        .map(|e| {
            json!({
                "plural_name": e.name,
                "source": e.source,
                "existing_translation": e.translation,
            })
        })
        .collect();
    Some(format!(
        "{}{}\n\n",
        REFERENCE_CONTEXT_HEADER,
        serde_json::to_string_pretty(&items).ok()?
    ))
}

/// User prompt for one `<string>` resource.
pub fn string_prompt(text: &str, language_name: &str, context: &TranslationContext) -> String {
    let mut prompt = String::from(TRANSLATION_GUIDELINES);
    if let Some(section) = string_reference_section(&context.reference_examples) {
        prompt.push('\n');
        prompt.push_str(&section);
    }
    prompt.push_str(&translate_final_text(language_name));
    prompt.push_str(text);
    prompt
}

/// User prompt for one `<plurals>` group, the source forms given as JSON.
pub fn plural_prompt(forms: &QuantityMap, language_name: &str, context: &TranslationContext) -> String {
    let mut prompt = String::from(TRANSLATION_GUIDELINES);
    prompt.push_str(PLURAL_GUIDELINES_ADDITION);
    if let Some(section) = plural_reference_section(&context.plural_examples) {
        prompt.push('\n');
        prompt.push_str(&section);
    }
    prompt.push_str(&translate_final_text(language_name));
    prompt.push_str(&serde_json::to_string_pretty(forms).unwrap_or_default());
    prompt
}
