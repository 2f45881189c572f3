// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Response Parser
//!
//! Regular-expression scans over model output for the structured analysis
//! grammar (`RELEVANCE`, `PRIVILEGE_RISK`, `CLASSIFICATION`,
//! `KEY FINDINGS`, `ANALYSIS`) and the redaction grammar
//! (`REDACTION_SUMMARY`, `REDACTED_SUBJECT`, `REDACTED_BODY`). Missing
//! fields fall back to the documented defaults (relevance 50, privilege
//! risk 0, needs-review) so a free-form answer never fails a document.
//! Topic tags are derived from configurable keyword rules over the
//! response and prompt text.

use once_cell::sync::Lazy;
use regex::Regex;

use evidence_domain::Classification;

const SUMMARY_LIMIT: usize = 500;
const MAX_STORED_TOPICS: usize = 3;

static RELEVANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)RELEVANCE:\s*(\d+)").expect("static pattern"));
static PRIVILEGE_RISK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PRIVILEGE[_\s]*RISK:\s*(\d+)").expect("static pattern"));
static CLASSIFICATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CLASSIFICATION:\s*(\S+)").expect("static pattern"));
static KEY_FINDINGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)KEY FINDINGS:\s*(.*?)(?:ANALYSIS:|$)").expect("static pattern")
});
static REDACTION_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)REDACTION_SUMMARY:\s*(.*?)(?:REDACTED_SUBJECT:|$)").expect("static pattern")
});
static REDACTED_SUBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)REDACTED_SUBJECT:\s*(.*?)(?:REDACTED_BODY:|$)").expect("static pattern")
});
static REDACTED_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)REDACTED_BODY:\s*(.*)$").expect("static pattern"));

/// The fixed preamble appended to the user's analysis prompt so the model
/// answers in the parseable shape.
pub fn analysis_system_prompt(custom_prompt: &str) -> String {
    format!(
        "{custom_prompt}\n\n\
         Please provide your analysis in this format:\n\
         RELEVANCE: [score 0-100]\n\
         PRIVILEGE_RISK: [score 0-100, likelihood this is attorney-client privileged communication]\n\
         CLASSIFICATION: [relevant/not-relevant/needs-review]\n\
         KEY FINDINGS: [bullet points of key findings]\n\
         ANALYSIS: [your detailed analysis]"
    )
}

/// The fixed preamble for the second, redaction-mode call.
pub fn redaction_system_prompt(redaction_prompt: &str) -> String {
    format!(
        "{redaction_prompt}\n\n\
         Please identify ALL content that matches the redaction criteria and provide:\n\
         1. A list of what needs to be redacted with specific instances\n\
         2. The redacted subject line (if applicable)\n\
         3. The redacted body text with replacements like [REDACTED - SSN], [REDACTED - NAME], etc.\n\n\
         Format your response as:\n\
         REDACTION_SUMMARY: [brief summary of what was redacted]\n\
         REDACTED_SUBJECT: [redacted subject line]\n\
         REDACTED_BODY: [full body text with redactions applied]"
    )
}

/// Parsed structured analysis with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    pub relevance_score: u8,
    pub privilege_risk: u8,
    pub classification: Classification,
    pub key_findings: String,
}

impl ParsedAnalysis {
    /// Summary column value: key findings when present, otherwise the head
    /// of the raw response.
    pub fn summary_from(&self, response: &str) -> String {
        let source = if self.key_findings.is_empty() {
            response
        } else {
            &self.key_findings
        };
        source.chars().take(SUMMARY_LIMIT).collect()
    }
}

/// Scans a model response; every missing field takes its default.
pub fn parse_analysis(response: &str) -> ParsedAnalysis {
    let relevance_score = RELEVANCE
        .captures(response)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|value| value.min(100) as u8)
        .unwrap_or(50);

    let privilege_risk = PRIVILEGE_RISK
        .captures(response)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|value| value.min(100) as u8)
        .unwrap_or(0);

    let classification = CLASSIFICATION
        .captures(response)
        .map(|caps| Classification::parse_lenient(&caps[1]))
        .unwrap_or(Classification::NeedsReview);

    let key_findings = KEY_FINDINGS
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default();

    ParsedAnalysis {
        relevance_score,
        privilege_risk,
        classification,
        key_findings,
    }
}

/// One keyword rule mapping response/prompt content onto a topic tag.
#[derive(Debug, Clone)]
pub struct TopicRule {
    pub tag: String,
    pub keywords: Vec<String>,
}

impl TopicRule {
    pub fn new(tag: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            tag: tag.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// The built-in topic rules.
pub fn default_topic_rules() -> Vec<TopicRule> {
    vec![
        TopicRule::new("Financial Fraud", &["fraud"]),
        TopicRule::new("Attorney-Client", &["privilege", "attorney"]),
        TopicRule::new("Compliance", &["compliance", "regulatory"]),
    ]
}

/// Topics whose keywords appear in the response or the prompt, capped at
/// the stored maximum.
pub fn derive_topics(response: &str, prompt: &str, rules: &[TopicRule]) -> Vec<String> {
    let haystack = format!("{} {}", response.to_lowercase(), prompt.to_lowercase());
    rules
        .iter()
        .filter(|rule| rule.keywords.iter().any(|keyword| haystack.contains(keyword)))
        .map(|rule| rule.tag.clone())
        .take(MAX_STORED_TOPICS)
        .collect()
}

/// Tag set for a classified document: classification tag, priority tier,
/// and any derived topics.
pub fn derive_tags(analysis: &ParsedAnalysis, topics: &[String]) -> Vec<String> {
    let mut tags = Vec::with_capacity(2 + topics.len());
    tags.push(
        match analysis.classification {
            Classification::Relevant => "AI: Relevant",
            Classification::NotRelevant => "AI: Not Relevant",
            Classification::NeedsReview => "AI: Needs Review",
        }
        .to_string(),
    );
    tags.push(
        if analysis.relevance_score >= 70 {
            "High Priority"
        } else if analysis.relevance_score >= 40 {
            "Medium Priority"
        } else {
            "Low Priority"
        }
        .to_string(),
    );
    tags.extend(topics.iter().cloned());
    tags
}

/// Parsed redaction response; absent sections fall back to the original
/// text at the call site.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRedaction {
    pub summary: String,
    pub redacted_subject: Option<String>,
    pub redacted_body: Option<String>,
}

pub fn parse_redaction(response: &str) -> ParsedRedaction {
    let summary = REDACTION_SUMMARY
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Redactions applied".to_string());

    let redacted_subject = REDACTED_SUBJECT
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty());

    let redacted_body = REDACTED_BODY
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty());

    ParsedRedaction {
        summary,
        redacted_subject,
        redacted_body,
    }
}
