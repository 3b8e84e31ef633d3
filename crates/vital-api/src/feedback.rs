//! Post-conversation feedback report

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores and commentary for a finished conversation.
///
/// Sub-scores are on a 0–10 scale. The report is produced by the service;
/// this crate only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    /// Absent from the service payload; filled in by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<u64>,
    pub empathy_score: f64,
    pub clarity_score: f64,
    pub emotional_alignment_score: f64,
    pub ethical_appropriateness_score: f64,
    pub cultural_sensitivity_score: f64,
    pub overall_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub suggested_responses: Vec<SuggestedResponse>,
    #[serde(default)]
    pub summary: String,
}

/// A better way to handle a moment from the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedResponse {
    #[serde(default)]
    pub situation: String,
    pub better_response: String,
}

impl FeedbackReport {
    /// The five sub-scores with display labels, in report order
    pub fn sub_scores(&self) -> [(&'static str, f64); 5] {
        [
            ("Empathy", self.empathy_score),
            ("Clarity", self.clarity_score),
            ("Emotional Alignment", self.emotional_alignment_score),
            ("Ethical Appropriateness", self.ethical_appropriateness_score),
            ("Cultural Sensitivity", self.cultural_sensitivity_score),
        ]
    }

    /// Band for the overall score
    pub fn overall_band(&self) -> ScoreBand {
        ScoreBand::for_score(self.overall_score)
    }
}

/// Qualitative band for a 0–10 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScoreBand {
    NeedsImprovement,
    Satisfactory,
    Good,
    Excellent,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 8.5 {
            ScoreBand::Excellent
        } else if score >= 7.0 {
            ScoreBand::Good
        } else if score >= 5.5 {
            ScoreBand::Satisfactory
        } else {
            ScoreBand::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Satisfactory => "Satisfactory",
            ScoreBand::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
