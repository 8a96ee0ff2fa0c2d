//! Rule tables that turn analysis output into guidance text. Stateless.

mod profile;

pub use profile::{
    learning_path, learning_profile, ImprovementArea, LearningPath, LearningProfile, LearningType,
    Milestone, Priority, WeeklyGoal, Weakness,
};

use crate::analysis::{AnomalyCategory, Archetype};
use crate::features::FeatureVector;

const MAX_REMEDIATIONS: usize = 5;

/// Threshold rules over a prediction feature vector, at most `max` entries.
pub fn prediction_recommendations(features: &FeatureVector, max: usize) -> Vec<String> {
    let get = |name: &str| features.get(name).unwrap_or(0.0);
    let rules: [(bool, &str); 6] = [
        (
            get("homework_completion_rate") < 0.7,
            "Improve homework completion and aim to submit every assignment",
        ),
        (
            get("homework_avg") < 70.0,
            "Strengthen the fundamentals to raise homework quality",
        ),
        (
            get("homework_consistency") < 0.5,
            "Keep a steady study rhythm to avoid swings in scores",
        ),
        (
            get("discussion_activity") < 3.0,
            "Take part in course discussions and exchange ideas with classmates",
        ),
        (
            get("video_engagement") < 100.0,
            "Spend more focused time on the course videos",
        ),
        (
            get("learning_consistency") < 0.6,
            "Draw up a study plan and keep learning continuously",
        ),
    ];
    rules
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, text)| text.to_string())
        .take(max)
        .collect()
}

/// Guidance attached to a behavioral archetype; generic advice for unnamed clusters.
pub fn cluster_recommendations(archetype: Option<Archetype>) -> Vec<String> {
    let lines: &[&str] = match archetype {
        Some(Archetype::HighEfficiency) => &[
            "Keep up the excellent study habits",
            "Consider helping classmates with their learning",
            "Take on more challenging material",
        ],
        Some(Archetype::Steady) => &[
            "Maintain the current study pace",
            "Add some extracurricular extension work",
            "Join more course discussions",
        ],
        Some(Archetype::NeedsSupport) => &[
            "Ask the instructor or classmates for help",
            "Write a more detailed study plan",
            "Focus on the quality of homework submissions",
        ],
        Some(Archetype::Passive) => &[
            "Participate more actively in course activities",
            "Increase time spent on course videos",
            "Start threads in the course discussion",
        ],
        None => &["Keep working steadily"],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

fn remediation_table(category: AnomalyCategory) -> &'static [&'static str] {
    match category {
        AnomalyCategory::LowEngagement => &[
            "Instructor should reach out to the student directly",
            "Pair the student with a study partner",
            "Offer additional learning incentives",
        ],
        AnomalyCategory::IrregularPattern => &[
            "Set up a fixed study timetable",
            "Provide time-management coaching",
            "Follow up on the study plan regularly",
        ],
        AnomalyCategory::PoorPerformance => &[
            "Schedule supplementary tutoring",
            "Re-assess foundational knowledge",
            "Provide a personalized learning plan",
        ],
        AnomalyCategory::ExcessiveStruggle => &[
            "Review whether the study method is effective",
            "Provide more introductory material",
            "Arrange one-to-one Q&A sessions",
        ],
        AnomalyCategory::InconsistentBehavior => &[
            "Talk with the student to understand their difficulties",
            "Check for external factors affecting the student",
            "Offer counselling and guidance",
        ],
        AnomalyCategory::Unknown => &[],
    }
}

/// Deduplicated remediation steps for the given categories, at most five.
pub fn anomaly_remediation(categories: &[AnomalyCategory]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in categories.iter().flat_map(|c| remediation_table(*c)) {
        if !out.iter().any(|l| l == line) {
            out.push(line.to_string());
        }
    }
    out.truncate(MAX_REMEDIATIONS);
    out
}
