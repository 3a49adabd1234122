use crate::config::AppConfig;
use crate::errors::{EngineError, EngineResult};
use crate::market::scanner::{atypical_options, ANALYSIS_RATIO};
use crate::state::{OptionContract, TickerData};
use reqwest::Client;
use std::sync::Arc;

/// Shown when the model answers but returns no text.
pub const EMPTY_FALLBACK: &str = "Análise indisponível no momento.";

/// Shown on any transport, HTTP or parse failure. Raw errors never reach the dashboard.
pub const ERROR_FALLBACK: &str =
    "Erro ao conectar com a IA. Verifique sua chave de API ou tente novamente mais tarde.";

const TEMPERATURE: f64 = 0.7;
const THINKING_BUDGET: u32 = 2500;

/// Generative-text client for the options commentary. One request per analysis.
#[derive(Clone)]
pub struct NarrativeClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl NarrativeClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        }
    }

    /// Commentary on the unusual-volume options in their technical context.
    ///
    /// Always returns display text: the model's answer verbatim, or one of the
    /// fixed fallback messages.
    pub async fn analyze(&self, options: &[Arc<OptionContract>], tickers: &[TickerData]) -> String {
        let atypical = atypical_options(options, ANALYSIS_RATIO);
        let prompt = match build_prompt(&atypical, tickers) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to build analysis prompt");
                return ERROR_FALLBACK.to_string();
            }
        };

        if self.api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY not set, returning fallback analysis");
            return ERROR_FALLBACK.to_string();
        }

        match self.generate(&prompt).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                tracing::info!(chars = text.len(), atypical = atypical.len(), "analysis received");
                text
            }
            Ok(_) => {
                tracing::warn!("analysis response carried no text");
                EMPTY_FALLBACK.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, model = %self.model, "analysis request failed");
                ERROR_FALLBACK.to_string()
            }
        }
    }

    async fn generate(&self, prompt: &str) -> EngineResult<Option<String>> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                thinking_config: ThinkingConfig {
                    thinking_budget: THINKING_BUDGET,
                },
            },
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Parse(format!("generateContent: {e}")))?;

        Ok(data.text())
    }
}

/// Prompt asking for a short-horizon and a long-horizon read of the flagged options.
pub fn build_prompt(atypical: &[Arc<OptionContract>], tickers: &[TickerData]) -> EngineResult<String> {
    let technicals: Vec<TechnicalSummary<'_>> = tickers
        .iter()
        .map(|t| TechnicalSummary {
            symbol: &t.symbol,
            price: t.price,
            kairi: t.technicals.kairi,
            rsi: t.technicals.rsi7,
            signal: t.technicals.signal.to_string(),
        })
        .collect();

    let options_json = serde_json::to_string(atypical)?;
    let technicals_json = serde_json::to_string(&technicals)?;

    Ok(format!(
        "Analise as opções da B3 com volume atípico considerando o contexto técnico.

  DADOS:
  - Opções Atípicas: {options_json}
  - Indicadores Técnicos: {technicals_json}

  Instrução Obrigatória - Forneça a resposta dividida em dois horizontes de tempo:

  1. **TRADE MENSAL (Curto Prazo)**:
     - Foco em Gamma e Delta.
     - Identifique oportunidades de \"tiro curto\" para o vencimento atual.
     - Sugira estruturas direcionais (Travas de Alta/Baixa) ou de volatilidade rápida.

  2. **TRADE LONGO PRAZO (> 3 Meses)**:
     - Foco em Vega e Theta.
     - Identifique oportunidades estruturais.
     - Sugira estruturas como Calendar Spreads (Trava Horizontal), Travas Diagonais ou compra de LEAPS.
     - Explique o racional de carregar essa posição por mais tempo.

  Seja direto, técnico e use terminologia de opções da B3."
    ))
}

#[derive(serde::Serialize)]
struct TechnicalSummary<'a> {
    symbol: &'a str,
    price: f64,
    kairi: f64,
    rsi: f64,
    signal: String,
}

// Request/response subset of the generateContent API:
// {
//   "candidates": [
//     { "content": { "parts": [ { "text": "..." } ], "role": "model" } }
//   ]
// }

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    thinking_config: ThinkingConfig,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(&self) -> Option<String> {
        let content = self.candidates.as_ref()?.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        Some(text)
    }
}
