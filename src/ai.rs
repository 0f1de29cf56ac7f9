use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;

use crate::models::{AiAnalysis, CompanyResearch, GroundingSource};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-3-flash-preview";

// --- Wire types ---

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

// --- Client ---

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY").context(
            "GEMINI_API_KEY environment variable not set. Set it with: export GEMINI_API_KEY=your-key-here",
        )?;
        let client = reqwest::blocking::Client::new();
        Ok(Self { api_key, client })
    }

    /// Structured analysis of one application: summary, interview tips,
    /// follow-up draft, and (when a resume is supplied) match score plus
    /// missing keywords. Single attempt, no retry.
    pub fn analyze_application(
        &self,
        role: &str,
        company: &str,
        notes: &str,
        master_resume: Option<&str>,
    ) -> Result<AiAnalysis> {
        let mut prompt = format!(
            "Analyze this job application for {} at {}. Notes/Details: {}",
            role, company, notes
        );
        if let Some(resume) = master_resume {
            prompt.push_str(&format!(
                "\n\nCompare this job against the following Master Resume and calculate a \
                 Match Score (0-100) and identify missing keywords: {}",
                resume
            ));
        }

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: analysis_schema(),
            }),
            tools: None,
        };

        let response = self.generate(&request)?;
        let text =
            first_text(&response).ok_or_else(|| anyhow!("No content in Gemini API response"))?;
        parse_analysis(&text)
    }

    /// Web-grounded company research: report text plus grounding sources,
    /// defaulting to an empty source list when the metadata is absent.
    pub fn research_company(&self, company: &str) -> Result<CompanyResearch> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!(
                        "Find recent news, company culture insights, and the core mission of {}. \
                         Provide a structured report.",
                        company
                    ),
                }],
            }],
            generation_config: None,
            tools: Some(vec![Tool {
                google_search: json!({}),
            }]),
        };

        let response = self.generate(&request)?;
        extract_research(&response)
    }

    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/{}:generateContent", GEMINI_API_URL, GEMINI_MODEL);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        response
            .json()
            .context("Failed to parse Gemini API response")
    }
}

/// Response schema for the structured analysis request. matchScore and
/// missingKeywords stay optional so resume-less requests omit them.
fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "interviewTips": { "type": "ARRAY", "items": { "type": "STRING" } },
            "followUpDraft": { "type": "STRING" },
            "matchScore": {
                "type": "NUMBER",
                "description": "Percentage match between resume and job."
            },
            "missingKeywords": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Specific skills or terms found in job but missing from resume."
            }
        },
        "required": ["summary", "interviewTips", "followUpDraft"]
    })
}

fn first_text(response: &GenerateResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    if content.parts.is_empty() {
        return None;
    }
    Some(
        content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(""),
    )
}

fn parse_analysis(text: &str) -> Result<AiAnalysis> {
    serde_json::from_str(text).context("Failed to parse AI analysis response")
}

fn extract_research(response: &GenerateResponse) -> Result<CompanyResearch> {
    let text =
        first_text(response).ok_or_else(|| anyhow!("No content in Gemini API response"))?;
    let sources = response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|m| {
            m.grounding_chunks
                .iter()
                .filter_map(|chunk| {
                    chunk.web.as_ref().map(|w| GroundingSource {
                        uri: w.uri.clone(),
                        title: w.title.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(CompanyResearch { text, sources })
}
