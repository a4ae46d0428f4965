use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use scout_core::config::{AiConfig, DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL};
use scout_core::error::AppError;
use scout_core::models::CompanyInfo;
use scout_core::traits::AiSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_SYSTEM_PROMPT: &str = "You are a company research assistant. Answer ONLY with a single JSON object describing the requested company. Use null for anything you do not know. Do not include explanations.";

/// Company-profile generator backed by an OpenAI-compatible chat API.
///
/// Defaults to Gemini's compatibility layer
/// (`https://generativelanguage.googleapis.com/v1beta/openai`), but works
/// with any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct GeminiSource {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl GeminiSource {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        Self::build(api_key, DEFAULT_AI_MODEL, DEFAULT_AI_BASE_URL, DEFAULT_AI_TIMEOUT)
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, AppError> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            AppError::ConfigError("SCOUT_AI_API_KEY not set. Required for AI generation.".into())
        })?;
        Self::build(api_key, &config.model, &config.base_url, config.timeout)
    }

    pub fn with_base_url(self, base_url: &str) -> Result<Self, AppError> {
        Self::build(&self.api_key, &self.model, base_url, self.timeout())
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        Self::build(&self.api_key, &self.model, &self.base_url, timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn build(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl AiSource for GeminiSource {
    async fn generate(
        &self,
        company_name: &str,
        linkedin_url: &str,
    ) -> Result<CompanyInfo, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: DEFAULT_SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_company_prompt(company_name, linkedin_url),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        tracing::debug!(company = %company_name, model = %self.model, "Sending request to AI service");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {}", e))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse AI response: {}", e)))?;

        let content = chat_response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::LlmError {
                message: "Empty response from AI service".into(),
                status_code: 200,
            })?;

        let json = extract_json_from_text(content).ok_or_else(|| {
            AppError::ParseError(format!("No JSON object in AI response. Raw: {}", content))
        })?;

        let value: Value = serde_json::from_str(json).map_err(|e| {
            AppError::ParseError(format!("AI returned invalid JSON: {}. Raw: {}", e, json))
        })?;

        company_from_json(&value, company_name, linkedin_url)
    }
}

/// Maps a non-2xx reply to an error. 429 is reported as a rate limit.
fn status_error(status_code: u16, body: &str) -> AppError {
    if status_code == 429 {
        return AppError::RateLimitExceeded;
    }

    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status_code, body));

    AppError::LlmError {
        message,
        status_code,
    }
}

/// The user prompt: a JSON template with every profile field, the name and
/// LinkedIn URL already filled in.
pub fn build_company_prompt(company_name: &str, linkedin_url: &str) -> String {
    let template = serde_json::json!({
        "name": company_name,
        "description": "[concise company summary or tagline]",
        "about_us": "[detailed company history and business description]",
        "mission": "[mission statement]",
        "vision": "[vision statement]",
        "culture": "[company culture]",
        "specialties": "[specialties and focus areas, comma separated]",
        "company_size": "[employee count range]",
        "headquarters": "[city, country]",
        "industry": "[primary industry]",
        "website": "[valid URL or null]",
        "career_page_url": "[valid URL or null]",
        "logo_url": "[valid URL or null]",
        "linkedin_url": linkedin_url,
    });
    let template = serde_json::to_string_pretty(&template).unwrap_or_default();

    format!(
        "Generate detailed information about the company '{company_name}' \
         (LinkedIn: {linkedin_url}).\n\n\
         Return the information as this JSON object:\n```json\n{template}\n```\n\n\
         Rules:\n\
         1. URLs must be absolute and start with http or https, otherwise null.\n\
         2. If a field is unknown, use null rather than a placeholder.\n\
         3. Return only the JSON object."
    )
}

/// Returns the outermost `{...}` in `text`, ignoring markdown fences and
/// any prose around it.
pub fn extract_json_from_text(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Builds a profile from the AI's JSON object.
///
/// Missing or `null` fields become empty strings; a missing name falls back
/// to the requested one.
pub fn company_from_json(
    value: &Value,
    company_name: &str,
    linkedin_url: &str,
) -> Result<CompanyInfo, AppError> {
    let object = value
        .as_object()
        .ok_or_else(|| AppError::ParseError("AI response is not a JSON object".into()))?;

    let field = |key: &str| -> String {
        match object.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    };

    let name = match field("name") {
        n if n.is_empty() => company_name.trim().to_string(),
        n => n,
    };
    let linkedin = match field("linkedin_url") {
        l if l.is_empty() => linkedin_url.to_string(),
        l => l,
    };
    let last_crawled_at = field("last_crawled_at")
        .parse::<DateTime<Utc>>()
        .unwrap_or_else(|_| Utc::now());

    Ok(CompanyInfo {
        name,
        description: field("description"),
        logo_url: url_field(field("logo_url")),
        website: url_field(field("website")),
        career_page_url: url_field(field("career_page_url")),
        about_us: field("about_us"),
        culture: field("culture"),
        mission: field("mission"),
        vision: field("vision"),
        company_size: field("company_size"),
        headquarters: field("headquarters"),
        industry: field("industry"),
        linkedin_url: linkedin,
        specialties: field("specialties"),
        last_crawled_at,
    })
}

/// Drops anything that is not an absolute http(s) URL.
fn url_field(raw: String) -> String {
    match url::Url::parse(&raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => raw,
        _ => String::new(),
    }
}
