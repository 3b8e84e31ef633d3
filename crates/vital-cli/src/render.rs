//! Plain-text rendering for the terminal

use vital_api::{FeedbackReport, Message, Role, Scenario, ScoreBand};
use vital_session::{PlaybackState, RecordingState, SessionEvent};

/// One transcript turn as a single line
pub fn message_line(message: &Message) -> String {
    match message.role {
        Role::User => format!("you: {}", message.content),
        Role::Agent => match message.emotional_state {
            Some(emotion) => format!("agent [{}]: {}", emotion.label(), message.content),
            None => format!("agent: {}", message.content),
        },
        Role::System => format!("* {}", message.content),
    }
}

/// What to print for a session event, if anything
pub fn event_line(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Disconnected => Some("[Disconnected from the conversation server]".to_string()),
        // Own turns are already on screen as typed
        SessionEvent::MessageAppended { message } if message.role == Role::User => None,
        SessionEvent::MessageAppended { message } => Some(message_line(message)),
        SessionEvent::EmotionChanged { emotion } => Some(format!("[Emotion: {}]", emotion.label())),
        SessionEvent::HintShown { content, quality } => Some(match quality {
            Some(quality) => format!("[Hint ({})] {}", quality, content),
            None => format!("[Hint] {}", content),
        }),
        SessionEvent::HintDismissed => None,
        SessionEvent::SystemNotice { content, status } => Some(match status.as_deref() {
            Some("warning") => format!("[Warning] {}", content),
            Some("error") => format!("[Server error] {}", content),
            _ => format!("[Notice] {}", content),
        }),
        SessionEvent::TranscriptRewound { removed } => {
            Some(format!("[Removed the last {} messages]", removed))
        }
        SessionEvent::AudioModeChanged { enabled } => Some(format!(
            "[Audio {}]",
            if *enabled { "on" } else { "off" }
        )),
        SessionEvent::RecordingStateChanged { state } => match state {
            RecordingState::Recording => Some("[Recording... type /stop when done]".to_string()),
            RecordingState::Transcribing => Some("[Transcribing...]".to_string()),
            RecordingState::Idle => None,
        },
        SessionEvent::PlaybackStateChanged { state } => match state {
            PlaybackState::Playing => Some("[Speaking...]".to_string()),
            PlaybackState::Idle => None,
        },
        SessionEvent::Error { message } => Some(format!("Error: {}", message)),
    }
}

/// Scenario catalog listing
pub fn scenario_list(scenarios: &[Scenario]) -> String {
    if scenarios.is_empty() {
        return "No scenarios available.".to_string();
    }

    let mut output = String::new();
    for scenario in scenarios {
        output.push_str(&format!(
            "{:>4}  {}  ({})\n",
            scenario.id, scenario.title, scenario.difficulty
        ));
        let patient = match (&scenario.patient_condition, scenario.patient_age) {
            (Some(condition), Some(age)) => Some(format!("{}, age {}", condition, age)),
            (Some(condition), None) => Some(condition.clone()),
            (None, Some(age)) => Some(format!("age {}", age)),
            (None, None) => None,
        };
        if let Some(patient) = patient {
            output.push_str(&format!("      Patient: {}\n", patient));
        }
        if !scenario.description.is_empty() {
            output.push_str(&format!("      {}\n", scenario.description));
        }
    }
    output.trim_end().to_string()
}

fn score_line(label: &str, score: f64) -> String {
    format!(
        "  {:<25} {:>4.1}/10  {}",
        label,
        score,
        ScoreBand::for_score(score)
    )
}

/// Feedback report with banded scores
pub fn feedback_report(report: &FeedbackReport) -> String {
    let mut output = match report.conversation_id {
        Some(id) => format!("Feedback for conversation {}\n", id),
        None => "Feedback\n".to_string(),
    };
    output.push_str(&"-".repeat(50));
    output.push('\n');

    output.push_str(&format!(
        "Overall: {:.1}/10 ({})\n\n",
        report.overall_score,
        report.overall_band()
    ));

    output.push_str("Scores:\n");
    for (label, score) in report.sub_scores() {
        output.push_str(&score_line(label, score));
        output.push('\n');
    }

    if !report.strengths.is_empty() {
        output.push_str("\nStrengths:\n");
        for item in &report.strengths {
            output.push_str(&format!("  + {}\n", item));
        }
    }

    if !report.areas_for_improvement.is_empty() {
        output.push_str("\nAreas for improvement:\n");
        for item in &report.areas_for_improvement {
            output.push_str(&format!("  - {}\n", item));
        }
    }

    if !report.suggested_responses.is_empty() {
        output.push_str("\nSuggested responses:\n");
        for suggestion in &report.suggested_responses {
            if suggestion.situation.is_empty() {
                output.push_str(&format!("  > {}\n", suggestion.better_response));
            } else {
                output.push_str(&format!(
                    "  {}:\n    > {}\n",
                    suggestion.situation, suggestion.better_response
                ));
            }
        }
    }

    if !report.summary.is_empty() {
        output.push_str(&format!("\n{}\n", report.summary));
    }

    output
}
