//! Personalized learning profile and learning path for one student.

use crate::error::AnalyticsError;
use crate::features::StudentIndicators;
use crate::records::StudentRecord;
use serde::{Deserialize, Serialize};

const MAX_RESOURCES: usize = 6;
const MAX_EXTRA_STRATEGIES: usize = 2;
const MAX_WEEKLY_GOALS: usize = 4;
const DEFAULT_TARGET_GAIN: f64 = 10.0;
const MILESTONES: usize = 3;

const PROGRAMMING_RESOURCES: [&str; 3] = [
    "Introductory programming exercise set",
    "Worked examples for core language features",
    "Advanced algorithm practice problems",
];
const DISCUSSION_RESOURCES: [&str; 3] = [
    "Guide to asking good questions in the course forum",
    "Peer study group sign-up",
    "Weekly discussion digest",
];
const DATA_ANALYSIS_RESOURCES: [&str; 4] = [
    "Recorded lecture series with chapter markers",
    "Short concept review videos",
    "Open data analysis project briefs",
    "Further reading on applied statistics",
];
const TIME_MANAGEMENT_RESOURCES: [&str; 3] = [
    "Weekly study planner template",
    "Pomodoro timing worksheet",
    "Habit tracking checklist",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningType {
    HighPerformer,
    SteadyLearner,
    StrugglingStudent,
    PassiveLearner,
    Unknown,
}

impl LearningType {
    fn from_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if s >= 90.0 => LearningType::HighPerformer,
            Some(s) if s >= 75.0 => LearningType::SteadyLearner,
            Some(s) if s >= 60.0 => LearningType::StrugglingStudent,
            Some(_) => LearningType::PassiveLearner,
            None => LearningType::Unknown,
        }
    }

    fn strategies(self) -> [&'static str; 3] {
        match self {
            LearningType::HighPerformer => [
                "Take on extension problems beyond the syllabus",
                "Explain solutions to classmates to deepen understanding",
                "Start a small independent project",
            ],
            LearningType::SteadyLearner | LearningType::Unknown => [
                "Keep a regular weekly study schedule",
                "Review each topic within two days of the lecture",
                "Work through one extra exercise per topic",
            ],
            LearningType::StrugglingStudent => [
                "Revisit foundational topics before new material",
                "Break assignments into small daily steps",
                "Bring questions to office hours every week",
            ],
            LearningType::PassiveLearner => [
                "Set a fixed daily study slot",
                "Post at least one question or answer each week",
                "Study with a partner to stay accountable",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weakness {
    LowHomeworkScores,
    LowCompletion,
    LowDiscussion,
    LowVideoTime,
    HighRumination,
    Fluctuating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementArea {
    pub area: String,
    pub priority: Priority,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub category: String,
    pub goal: String,
    pub target: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningProfile {
    pub user_id: String,
    pub homework_performance: Option<f64>,
    pub completion_rate: f64,
    pub discussion_activity: f64,
    pub video_watch_time: f64,
    pub rumination_ratio: f64,
    pub overall_score: Option<f64>,
    pub learning_type: LearningType,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<Weakness>,
    pub resources: Vec<String>,
    pub strategies: Vec<String>,
    pub improvement_areas: Vec<ImprovementArea>,
    pub weekly_goals: Vec<WeeklyGoal>,
}

fn push_unique(out: &mut Vec<String>, items: &[&str]) {
    for item in items {
        if !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
}

fn improvement_area(weakness: Weakness) -> Option<ImprovementArea> {
    let (area, priority, actions): (&str, Priority, &[&str]) = match weakness {
        Weakness::LowHomeworkScores => (
            "homework quality",
            Priority::High,
            &["Review graded feedback before the next assignment", "Redo incorrect exercises"],
        ),
        Weakness::LowCompletion => (
            "homework completion",
            Priority::High,
            &["Submit every assignment, even if incomplete", "Start assignments on the day they open"],
        ),
        Weakness::LowDiscussion => (
            "course participation",
            Priority::Medium,
            &["Reply to one classmate's post each week", "Post questions as they come up"],
        ),
        Weakness::LowVideoTime => (
            "video study",
            Priority::Medium,
            &["Watch each lecture video in full", "Summarize every video in three sentences"],
        ),
        Weakness::Fluctuating => (
            "study rhythm",
            Priority::Medium,
            &["Study at the same time each day", "Track weekly progress in a planner"],
        ),
        Weakness::HighRumination => return None,
    };
    Some(ImprovementArea {
        area: area.to_string(),
        priority,
        actions: actions.iter().map(|a| a.to_string()).collect(),
    })
}

fn goal(category: &str, goal: &str, target: &str, priority: Priority) -> WeeklyGoal {
    WeeklyGoal {
        category: category.to_string(),
        goal: goal.to_string(),
        target: target.to_string(),
        priority,
    }
}

/// Banded strengths and weaknesses with matching resources and goals.
pub fn learning_profile(record: &StudentRecord) -> Result<LearningProfile, AnalyticsError> {
    let s = StudentIndicators::from_record(record)?;
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    if let Some(avg) = s.homework_avg {
        if avg >= 85.0 {
            strengths.push("high-quality homework".to_string());
        } else if avg < 60.0 {
            weaknesses.push(Weakness::LowHomeworkScores);
        }
        if s.completion_rate < 0.8 {
            weaknesses.push(Weakness::LowCompletion);
        }
    }

    if record.discussion.is_present() {
        let total = s.posted + s.replied + s.upvotes;
        if total >= 15.0 {
            strengths.push("active in course discussion".to_string());
        } else if total < 5.0 {
            weaknesses.push(Weakness::LowDiscussion);
        }
    }

    if record.video.is_present() {
        if s.video_watch_time >= 300.0 {
            strengths.push("thorough video study".to_string());
        } else if s.video_watch_time < 120.0 {
            weaknesses.push(Weakness::LowVideoTime);
        }
        if s.rumination_ratio > 0.3 {
            weaknesses.push(Weakness::HighRumination);
        }
    }

    let scored = record
        .homework
        .as_option()
        .map_or(0, |h| h.scores.iter().filter(|v| **v > 0.0).count());
    if scored >= 3 {
        if s.consistency_score > 0.8 {
            strengths.push("stable performance".to_string());
        } else if s.consistency_score < 0.5 {
            weaknesses.push(Weakness::Fluctuating);
        }
    }

    let learning_type = LearningType::from_score(s.comprehensive_score);

    let mut resources = Vec::new();
    for w in &weaknesses {
        match w {
            Weakness::LowHomeworkScores => push_unique(&mut resources, &PROGRAMMING_RESOURCES[..2]),
            Weakness::LowDiscussion => push_unique(&mut resources, &DISCUSSION_RESOURCES[..2]),
            Weakness::LowVideoTime => push_unique(&mut resources, &DATA_ANALYSIS_RESOURCES[..2]),
            Weakness::Fluctuating => push_unique(&mut resources, &TIME_MANAGEMENT_RESOURCES[..2]),
            Weakness::LowCompletion | Weakness::HighRumination => {}
        }
    }
    match learning_type {
        LearningType::HighPerformer => push_unique(&mut resources, &DATA_ANALYSIS_RESOURCES[2..]),
        LearningType::StrugglingStudent | LearningType::PassiveLearner => {
            push_unique(&mut resources, &PROGRAMMING_RESOURCES[..2])
        }
        LearningType::SteadyLearner | LearningType::Unknown => {}
    }
    resources.truncate(MAX_RESOURCES);

    let mut strategies: Vec<String> = learning_type.strategies().iter().map(|s| s.to_string()).collect();
    let extras = weaknesses
        .iter()
        .filter_map(|w| match w {
            Weakness::LowCompletion => Some("Set a daily homework reminder"),
            Weakness::HighRumination => Some("Take notes while watching videos to improve comprehension"),
            _ => None,
        })
        .take(MAX_EXTRA_STRATEGIES);
    strategies.extend(extras.map(String::from));

    let improvement_areas = weaknesses.iter().filter_map(|w| improvement_area(*w)).collect();

    let mut weekly_goals = vec![goal(
        "homework",
        "Complete and submit this week's homework",
        "100% submission",
        Priority::High,
    )];
    if weaknesses.contains(&Weakness::LowDiscussion) {
        weekly_goals.push(goal(
            "discussion",
            "Contribute to the course forum",
            "at least 3 posts or replies",
            Priority::Medium,
        ));
    }
    if weaknesses.contains(&Weakness::LowVideoTime) {
        weekly_goals.push(goal(
            "video",
            "Watch the assigned lecture videos",
            "at least 120 minutes",
            Priority::Medium,
        ));
    }
    match learning_type {
        LearningType::HighPerformer => weekly_goals.push(goal(
            "extension",
            "Finish one extension problem",
            "1 problem",
            Priority::Low,
        )),
        LearningType::StrugglingStudent | LearningType::PassiveLearner => weekly_goals.push(goal(
            "review",
            "Consolidate the fundamentals covered so far",
            "2 review sessions",
            Priority::High,
        )),
        LearningType::SteadyLearner | LearningType::Unknown => {}
    }
    weekly_goals.truncate(MAX_WEEKLY_GOALS);

    Ok(LearningProfile {
        user_id: record.user_id.clone(),
        homework_performance: s.homework_avg,
        completion_rate: s.completion_rate,
        discussion_activity: s.discussion_activity(),
        video_watch_time: s.video_watch_time,
        rumination_ratio: s.rumination_ratio,
        overall_score: s.comprehensive_score,
        learning_type,
        strengths,
        weaknesses,
        resources,
        strategies,
        improvement_areas,
        weekly_goals,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub week: u32,
    pub target_score: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub user_id: String,
    pub current_score: f64,
    pub target_score: f64,
    pub gap: f64,
    pub current_level: String,
    pub target_level: String,
    pub estimated_weeks: u32,
    pub milestones: Vec<Milestone>,
    pub priority_actions: Vec<String>,
}

fn level(score: f64) -> &'static str {
    if score >= 90.0 {
        "excellent"
    } else if score >= 80.0 {
        "good"
    } else if score >= 70.0 {
        "fair"
    } else if score >= 60.0 {
        "passing"
    } else {
        "needs improvement"
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Staged plan from the current comprehensive score to `target`
/// (current + 10 when not given, capped at 100).
pub fn learning_path(
    record: &StudentRecord,
    target: Option<f64>,
) -> Result<LearningPath, AnalyticsError> {
    let s = StudentIndicators::from_record(record)?;
    let current = s.comprehensive_score.unwrap_or(0.0);
    let target = target
        .filter(|t| t.is_finite())
        .unwrap_or(current + DEFAULT_TARGET_GAIN)
        .max(0.0)
        .min(100.0);
    let gap = target - current;
    let estimated_weeks = ((gap / 2.0).floor().max(2.0)) as u32;

    let step = gap / MILESTONES as f64;
    let milestones = (1..=MILESTONES)
        .map(|i| {
            let t = round1(current + step * i as f64);
            Milestone {
                week: (estimated_weeks * i as u32).div_ceil(MILESTONES as u32),
                target_score: t,
                description: format!("Reach {t} ({})", level(t)),
            }
        })
        .collect();

    let priority_actions: &[&str] = if gap > 15.0 {
        &[
            "Rebuild the fundamentals with guided review",
            "Meet the instructor for a personal study plan",
            "Double weekly study time for the next month",
        ]
    } else if gap > 8.0 {
        &[
            "Focus on the weakest topics first",
            "Complete every homework assignment on time",
            "Join a weekly study group",
        ]
    } else {
        &[
            "Keep the current routine",
            "Polish accuracy on homework details",
        ]
    };

    Ok(LearningPath {
        user_id: record.user_id.clone(),
        current_score: current,
        target_score: target,
        gap,
        current_level: level(current).to_string(),
        target_level: level(target).to_string(),
        estimated_weeks,
        milestones,
        priority_actions: priority_actions.iter().map(|a| a.to_string()).collect(),
    })
}
