//! Derived per-student indicators. Every absent sub-record resolves to its
//! neutral default here and nowhere else.

use super::stats::{mean, std_dev};
use crate::error::AnalyticsError;
use crate::records::{StudentRecord, HOMEWORK_SLOTS, VIDEO_SLOTS};
use serde::{Deserialize, Serialize};

/// Stand-in for an unknown baseline score.
pub const NEUTRAL_BASELINE_SCORE: f64 = 30.0;
/// Consistency reported when fewer than three scores exist.
pub const NEUTRAL_CONSISTENCY: f64 = 0.5;
/// Cap on the re-watch penalty applied to video time.
pub const RUMINATION_PENALTY_CAP: f64 = 0.5;
const CONSISTENCY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentIndicators {
    /// Mean of submitted homework scores, if any were submitted
    pub homework_avg: Option<f64>,
    pub homework_std: f64,
    pub completion_rate: f64,
    pub consistency_score: f64,
    pub posted: f64,
    pub replied: f64,
    pub upvotes: f64,
    pub engagement_level: f64,
    pub video_watch_time: f64,
    /// Mean of non-zero rumination ratios
    pub rumination_ratio: f64,
    pub video_investment: f64,
    pub exam_score: Option<f64>,
    pub comprehensive_score: Option<f64>,
    pub course_points: Option<f64>,
    pub academic_performance: f64,
}

fn check(user_id: &str, field: &str, value: f64) -> Result<f64, AnalyticsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AnalyticsError::RecordExtraction {
            user_id: user_id.to_string(),
            reason: format!("{field} must be finite and non-negative, got {value}"),
        })
    }
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

impl StudentIndicators {
    pub fn from_record(record: &StudentRecord) -> Result<Self, AnalyticsError> {
        let id = record.user_id.as_str();
        let mut s = StudentIndicators {
            consistency_score: NEUTRAL_CONSISTENCY,
            ..Default::default()
        };

        if let Some(hw) = record.homework.as_option() {
            if hw.scores.len() > HOMEWORK_SLOTS {
                return Err(AnalyticsError::RecordExtraction {
                    user_id: id.to_string(),
                    reason: format!("{} homework scores, at most {HOMEWORK_SLOTS}", hw.scores.len()),
                });
            }
            let mut valid = Vec::with_capacity(hw.scores.len());
            for &score in &hw.scores {
                if check(id, "homework score", score)? > 0.0 {
                    valid.push(score);
                }
            }
            if !hw.scores.is_empty() {
                s.completion_rate = valid.len() as f64 / hw.scores.len() as f64;
            }
            if !valid.is_empty() {
                s.homework_avg = Some(mean(&valid));
                s.homework_std = std_dev(&valid);
            }
            if valid.len() >= 3 {
                s.consistency_score =
                    1.0 / (1.0 + std_dev(&valid) / (mean(&valid) + CONSISTENCY_EPSILON));
            }
        }

        if let Some(d) = record.discussion.as_option() {
            s.posted = d.posted as f64;
            s.replied = d.replied as f64;
            s.upvotes = d.upvotes as f64;
        }
        s.engagement_level = s.posted * 2.0 + s.replied + s.upvotes * 0.5;

        if let Some(v) = record.video.as_option() {
            if v.sessions.len() > VIDEO_SLOTS {
                return Err(AnalyticsError::RecordExtraction {
                    user_id: id.to_string(),
                    reason: format!("{} video sessions, at most {VIDEO_SLOTS}", v.sessions.len()),
                });
            }
            let mut ratios = Vec::with_capacity(v.sessions.len());
            for session in &v.sessions {
                s.video_watch_time += check(id, "watch duration", session.watch_duration)?;
                if check(id, "rumination ratio", session.rumination_ratio)? > 0.0 {
                    ratios.push(session.rumination_ratio);
                }
            }
            s.rumination_ratio = mean(&ratios);
            s.video_investment =
                s.video_watch_time * (1.0 - s.rumination_ratio.min(RUMINATION_PENALTY_CAP));
        }

        if let Some(e) = record.exam.as_option() {
            s.exam_score = positive(check(id, "exam score", e.score)?);
        }
        if let Some(syn) = record.synthesis.as_option() {
            s.comprehensive_score = positive(check(id, "comprehensive score", syn.comprehensive_score)?);
            s.course_points = positive(check(id, "course points", syn.course_points)?);
        }

        s.academic_performance = s
            .comprehensive_score
            .or(s.exam_score)
            .or(s.homework_avg)
            .unwrap_or(NEUTRAL_BASELINE_SCORE);

        Ok(s)
    }

    /// Posted plus replied discussions.
    pub fn discussion_activity(&self) -> f64 {
        self.posted + self.replied
    }

    /// Upvotes per discussion contribution, 0 without contributions.
    pub fn upvotes_ratio(&self) -> f64 {
        let activity = self.discussion_activity();
        if activity > 0.0 {
            self.upvotes / activity
        } else {
            0.0
        }
    }

    pub fn learning_consistency(&self) -> f64 {
        self.consistency_score * 0.4
            + self.completion_rate.min(1.0) * 0.3
            + (self.discussion_activity() / 10.0).min(1.0) * 0.3
    }

    pub fn learning_pattern_score(&self) -> f64 {
        self.completion_rate * 0.3
            + self.discussion_activity().min(20.0) / 20.0 * 0.3
            + self.video_watch_time.min(500.0) / 500.0 * 0.4
    }

    pub fn engagement_score(&self) -> f64 {
        self.completion_rate * 0.4
            + (self.discussion_activity() + self.upvotes * 2.0).min(30.0) / 30.0 * 0.3
            + self.video_watch_time.min(400.0) / 400.0 * 0.3
    }
}
