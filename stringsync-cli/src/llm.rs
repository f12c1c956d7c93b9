//! Translation through an OpenAI-compatible chat completions API.
//!
//! Both supported providers speak the same protocol; OpenRouter additionally
//! accepts attribution headers. Answers are requested through function
//! calling so the model returns structured arguments instead of free text.

use std::{collections::BTreeMap, str::FromStr, thread, time::Duration};

use clap::ValueEnum;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stringsync::{
    Error, QuantityCategory, QuantityMap, TranslationContext, Translator,
};

use crate::prompts;

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-preview-09-2025";

const MAX_RETRIES: usize = 3;
const BASE_DELAY_MS: u64 = 800;
const TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[value(name = "openai")]
    OpenAi,
    #[default]
    #[value(name = "openrouter")]
    OpenRouter,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(format!(
                "Unknown LLM provider: {}. Supported providers: openai, openrouter",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    /// Overrides the provider's API root, e.g. for a proxy.
    pub base_url: Option<String>,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    pub send_site_info: bool,
}

impl LlmConfig {
    fn endpoint(&self) -> String {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.base_url());
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    /// OpenRouter attribution headers, when enabled and configured.
    fn extra_headers(&self) -> Vec<(&'static str, String)> {
        if self.provider != Provider::OpenRouter || !self.send_site_info {
            return Vec::new();
        }
        let mut headers = Vec::new();
        if let Some(url) = self.site_url.as_ref().filter(|u| !u.is_empty()) {
            headers.push(("HTTP-Referer", url.clone()));
        }
        if let Some(name) = self.site_name.as_ref().filter(|n| !n.is_empty()) {
            headers.push(("X-Title", name.clone()));
        }
        headers
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    tools: Vec<Value>,
    tool_choice: &'static str,
    parallel_tool_calls: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct StringArguments {
    translation: String,
}

fn translate_string_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "translate_string",
            "description": "Translate a single Android UI string to the target language following all translation guidelines",
            "strict": true,
            "parameters": {
                "type": "object",
                "properties": {
                    "translation": {
                        "type": "string",
                        "description": "The translated text in the target language with proper character escaping"
                    }
                },
                "required": ["translation"],
                "additionalProperties": false
            }
        }
    })
}

fn translate_plural_tool() -> Value {
    let described = |text: &str| json!({ "type": "string", "description": text });
    json!({
        "type": "function",
        "function": {
            "name": "translate_plural",
            "description": "Translate Android plural resources with all appropriate quantity forms for the target language",
            "parameters": {
                "type": "object",
                "properties": {
                    "one": described("Translation for singular quantity (e.g., '1 day')"),
                    "other": described("Translation for other quantities (e.g., '%d days') - this is the default fallback"),
                    "zero": described("Translation for zero quantity if the target language requires it"),
                    "two": described("Translation for dual quantity if the target language requires it"),
                    "few": described("Translation for few quantity if the target language requires it (e.g., Slavic languages)"),
                    "many": described("Translation for many quantity if the target language requires it (e.g., Slavic languages)")
                },
                "required": [],
                "additionalProperties": false
            }
        }
    })
}

fn should_retry_http(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(BASE_DELAY_MS * 2_u64.pow(attempt as u32))
}

/// Reads `{"error": {"message": ...}}` or `{"message": ...}` from an error body.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        let message = v
            .get("error")
            .and_then(|e| e.get("message"))
            .or_else(|| v.get("message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return format!("HTTP {}: {}", status.as_u16(), message);
        }
    }
    let trimmed = body.trim();
    let snippet: String = trimmed.chars().take(400).collect();
    if snippet.len() < trimmed.len() {
        format!("HTTP {}: {}...", status.as_u16(), snippet)
    } else {
        format!("HTTP {}: {}", status.as_u16(), snippet)
    }
}

/// Arguments of the first tool call of a chat completion.
fn tool_arguments(body: &str) -> Result<Value, String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("Invalid response: {}", e))?;
    let call = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.tool_calls?.into_iter().next())
        .ok_or_else(|| "Model did not return any tool calls".to_string())?;
    tracing::debug!("Function called: {} with {}", call.function.name, call.function.arguments);
    serde_json::from_str(&call.function.arguments)
        .map_err(|e| format!("Invalid function arguments: {}", e))
}

/// Converts plural tool arguments into a quantity map.
///
/// Unknown keys are dropped. A lone form without `other` is also used as `other`.
fn plural_forms(arguments: Value) -> Result<QuantityMap, String> {
    let raw: BTreeMap<String, String> = serde_json::from_value(arguments)
        .map_err(|e| format!("Invalid plural arguments: {}", e))?;
    let mut forms = QuantityMap::new();
    for (key, text) in raw {
        match QuantityCategory::from_str(&key) {
            Ok(quantity) => {
                forms.insert(quantity, text);
            }
            Err(_) => tracing::warn!("Ignoring unknown plural quantity '{}' from model", key),
        }
    }
    if !forms.contains_key(&QuantityCategory::Other) && forms.len() == 1 {
        if let Some((quantity, text)) = forms.iter().next().map(|(q, t)| (*q, t.clone())) {
            tracing::info!("Using '{}' value as 'other' fallback", quantity);
            forms.insert(QuantityCategory::Other, text);
        }
    }
    Ok(forms)
}

/// [`Translator`] backed by a chat completions endpoint.
pub struct LlmTranslator {
    config: LlmConfig,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl LlmTranslator {
    pub fn new(config: LlmConfig) -> Result<Self, String> {
        if config.api_key.trim().is_empty() {
            return Err("API key is required".to_string());
        }
        if config.model.trim().is_empty() {
            return Err("Model name is required".to_string());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Cannot create HTTP client: {}", e))?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| format!("Cannot start async runtime: {}", e))?;
        tracing::info!(
            "Initialized LLM client with provider={}, model={}",
            config.provider.as_str(),
            config.model
        );
        Ok(LlmTranslator {
            config,
            client,
            runtime,
        })
    }

    fn request(&self, system: String, user: String, tool: Value) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system,
                },
                Message {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            temperature: 0.0,
            tools: vec![tool],
            tool_choice: "required",
            parallel_tool_calls: false,
        }
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<(StatusCode, String), reqwest::Error> {
        let mut builder = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request);
        for (name, value) in self.config.extra_headers() {
            builder = builder.header(name, value);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Sends `request`, retrying timeouts, rate limits and server errors.
    fn complete(&self, request: &ChatRequest) -> Result<Value, String> {
        tracing::debug!(
            "Sending chat completion request to {} (model: {})",
            self.config.provider.as_str(),
            self.config.model
        );
        let mut last_error = String::new();
        for attempt in 0..MAX_RETRIES {
            let retry = attempt + 1 < MAX_RETRIES;
            match self.runtime.block_on(self.send_once(request)) {
                Ok((status, body)) if status.is_success() => return tool_arguments(&body),
                Ok((status, body)) => {
                    last_error = extract_error_message(status, &body);
                    if !(should_retry_http(status) && retry) {
                        break;
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    if !retry {
                        break;
                    }
                }
            }
            tracing::warn!("Request failed ({}), retrying", last_error);
            thread::sleep(backoff(attempt));
        }
        tracing::error!(
            "Error calling {} API: {}",
            self.config.provider.as_str(),
            last_error
        );
        Err(last_error)
    }
}

impl Translator for LlmTranslator {
    fn translate_entry(
        &self,
        text: &str,
        language_name: &str,
        context: &TranslationContext,
    ) -> Result<String, Error> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let request = self.request(
            prompts::system_message(language_name, context.project_context.as_deref()),
            prompts::string_prompt(text, language_name, context),
            translate_string_tool(),
        );
        let arguments = self
            .complete(&request)
            .map_err(|e| Error::translation(&context.key, e))?;
        let arguments: StringArguments = serde_json::from_value(arguments)
            .map_err(|e| Error::translation(&context.key, format!("Invalid arguments: {}", e)))?;
        Ok(arguments.translation)
    }

    fn translate_group(
        &self,
        forms: &QuantityMap,
        language_name: &str,
        context: &TranslationContext,
    ) -> Result<QuantityMap, Error> {
        let request = self.request(
            prompts::system_message(language_name, context.project_context.as_deref()),
            prompts::plural_prompt(forms, language_name, context),
            translate_plural_tool(),
        );
        let arguments = self
            .complete(&request)
            .map_err(|e| Error::translation(&context.key, e))?;
        plural_forms(arguments).map_err(|e| Error::translation(&context.key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: Provider) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            base_url: None,
            site_url: Some("https://example.com".to_string()),
            site_name: Some("Example".to_string()),
            send_site_info: true,
        }
    }

    fn tool_response(arguments: &str) -> String {
        json!({
            "id": "chatcmpl-123",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "translate_string", "arguments": arguments }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenRouter".parse::<Provider>().unwrap(), Provider::OpenRouter);
        assert_eq!(" openai ".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert!("anthropic".parse::<Provider>().is_err());
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            config(Provider::OpenRouter).endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        let mut proxied = config(Provider::OpenAi);
        proxied.base_url = Some("http://localhost:8080/v1/".to_string());
        assert_eq!(proxied.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_extra_headers_only_for_openrouter() {
        assert_eq!(
            config(Provider::OpenRouter).extra_headers(),
            vec![
                ("HTTP-Referer", "https://example.com".to_string()),
                ("X-Title", "Example".to_string())
            ]
        );
        assert!(config(Provider::OpenAi).extra_headers().is_empty());

        let mut private = config(Provider::OpenRouter);
        private.send_site_info = false;
        assert!(private.extra_headers().is_empty());
    }

    #[test]
    fn test_request_serialization() {
        let translator = LlmTranslator::new(config(Provider::OpenAi)).unwrap();
        let request = translator.request(
            "system".to_string(),
            "user".to_string(),
            translate_string_tool(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["tool_choice"], "required");
        assert_eq!(json["parallel_tool_calls"], false);
        assert_eq!(json["tools"][0]["function"]["name"], "translate_string");
        assert_eq!(json["messages"][1]["content"], "user");
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let mut empty = config(Provider::OpenAi);
        empty.api_key = String::new();
        assert!(LlmTranslator::new(empty).is_err());
    }

    #[test]
    fn test_tool_arguments() {
        let body = tool_response(r#"{"translation": "Hola"}"#);
        let arguments: StringArguments =
            serde_json::from_value(tool_arguments(&body).unwrap()).unwrap();
        assert_eq!(arguments.translation, "Hola");

        let no_call = json!({"choices": [{"message": {"content": "Hola"}}]}).to_string();
        assert!(tool_arguments(&no_call).unwrap_err().contains("tool calls"));
    }

    #[test]
    fn test_plural_forms() {
        let forms = plural_forms(json!({"one": "%d dzień", "few": "%d dni", "other": "%d dni", "plenty": "x"})).unwrap();
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[&QuantityCategory::Few], "%d dni");

        let lone = plural_forms(json!({"one": "%d día"})).unwrap();
        assert_eq!(lone[&QuantityCategory::Other], "%d día");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            extract_error_message(
                StatusCode::UNAUTHORIZED,
                r#"{"error": {"message": "Invalid API key"}}"#
            ),
            "HTTP 401: Invalid API key"
        );
        assert_eq!(
            extract_error_message(StatusCode::BAD_GATEWAY, "  upstream down  "),
            "HTTP 502: upstream down"
        );
        assert!(should_retry_http(StatusCode::TOO_MANY_REQUESTS));
        assert!(!should_retry_http(StatusCode::UNAUTHORIZED));
    }
}
