//! Client for the external text-generation service that writes a short
//! financial commentary about a finished projection.
//!
//! The projection is never affected by this module: every failure is turned
//! into one of the fixed fallback messages below.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NarrativeSettings;
use crate::core::{SimulationParameters, SimulationResult};
use crate::report::format_currency;

pub const MISSING_KEY_MESSAGE: &str =
    "API Key não configurada. Por favor, adicione sua chave da API Gemini para receber análises.";
pub const SERVICE_ERROR_MESSAGE: &str = "Ocorreu um erro ao conectar com a IA para análise.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "Não foi possível gerar a análise no momento.";

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative service API key is not configured")]
    MissingApiKey,
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("request to narrative service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("narrative service returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("narrative service returned no text")]
    EmptyResponse,
}

impl NarrativeError {
    pub fn fallback_message(&self) -> &'static str {
        match self {
            NarrativeError::MissingApiKey => MISSING_KEY_MESSAGE,
            NarrativeError::EmptyResponse => EMPTY_RESPONSE_MESSAGE,
            NarrativeError::Client(_)
            | NarrativeError::Transport(_)
            | NarrativeError::Status { .. } => SERVICE_ERROR_MESSAGE,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NarrativeClient {
    http: Client,
    settings: NarrativeSettings,
}

impl NarrativeClient {
    pub fn new(settings: NarrativeSettings) -> Result<Self, NarrativeError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| NarrativeError::Client(e.to_string()))?;
        Ok(Self { http, settings })
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Returns the commentary, or a user-facing fallback message when the
    /// service is unconfigured, unreachable or answers without text.
    pub async fn generate(&self, params: &SimulationParameters, result: &SimulationResult) -> String {
        match self.try_generate(params, result).await {
            Ok(text) => text,
            Err(NarrativeError::MissingApiKey) => {
                tracing::info!("narrative requested without an API key");
                MISSING_KEY_MESSAGE.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, model = %self.settings.model, "narrative generation failed");
                e.fallback_message().to_string()
            }
        }
    }

    pub async fn try_generate(
        &self,
        params: &SimulationParameters,
        result: &SimulationResult,
    ) -> Result<String, NarrativeError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(NarrativeError::MissingApiKey)?;

        let prompt = build_prompt(params, result);
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [RequestPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let endpoint = self.endpoint();
        tracing::debug!(%endpoint, prompt_chars = prompt.chars().count(), "requesting narrative");
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        extract_text(payload).ok_or(NarrativeError::EmptyResponse)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

fn extract_text(payload: GenerateContentResponse) -> Option<String> {
    let text: String = payload
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

pub fn build_prompt(params: &SimulationParameters, result: &SimulationResult) -> String {
    let summary = &result.summary;
    format!(
        "Atue como um consultor financeiro experiente no mercado brasileiro.\n\
         Analise a seguinte simulação de investimento com juros compostos.\n\
         \n\
         DADOS DE ENTRADA:\n\
         - Valor Inicial: {initial}\n\
         - Aporte Mensal: {contribution}\n\
         - Taxa de Juros: {rate}% ({basis})\n\
         - Período: {horizon} {unit}\n\
         \n\
         RESULTADOS:\n\
         - Total Investido: {invested}\n\
         - Total em Juros: {interest}\n\
         - Montante Final: {amount}\n\
         \n\
         Escreva uma análise concisa (no máximo 200 palavras) que cubra:\n\
         1. A eficácia dessa estratégia no longo prazo.\n\
         2. O efeito dos juros compostos neste cenário, comparando o valor investido com os juros.\n\
         3. Uma sugestão ou ponto de atenção, como inflação ou diversificação.\n\
         \n\
         Use Markdown simples (negrito e listas). Seja encorajador, mas realista.\n",
        initial = format_currency(params.initial_value),
        contribution = format_currency(params.monthly_contribution),
        rate = params.interest_rate.normalize(),
        basis = params.interest_rate_basis.label(),
        horizon = params.horizon,
        unit = params.horizon_unit.label(),
        invested = format_currency(summary.total_contributed),
        interest = format_currency(summary.total_interest_accrued),
        amount = format_currency(summary.total_amount),
    )
}
