//! Student activity aggregates handed to the analytics core.
//! Every category sub-record is a [`Presence`]; absence is a normal state.

mod loader;

pub use loader::load_records;

use serde::{Deserialize, Serialize};

/// Homework slots tracked per student.
pub const HOMEWORK_SLOTS: usize = 8;
/// Video units tracked per student.
pub const VIDEO_SLOTS: usize = 7;

/// Explicit presence of a category sub-record. Serialized as the record or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<T>", into = "Option<T>")]
pub enum Presence<T: Clone> {
    Present(T),
    Absent,
}

impl<T: Clone> Default for Presence<T> {
    fn default() -> Self {
        Presence::Absent
    }
}

impl<T: Clone> From<Option<T>> for Presence<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Presence::Present(v),
            None => Presence::Absent,
        }
    }
}

impl<T: Clone> From<Presence<T>> for Option<T> {
    fn from(value: Presence<T>) -> Self {
        match value {
            Presence::Present(v) => Some(v),
            Presence::Absent => None,
        }
    }
}

impl<T: Clone> Presence<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Presence::Present(v) => Some(v),
            Presence::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present(_))
    }
}

/// Ordered homework scores; `0` means not submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeworkScores {
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscussionStats {
    pub posted: u32,
    pub replied: u32,
    pub upvotes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSession {
    /// Watch duration in minutes
    pub watch_duration: f64,
    /// Share of the unit that was re-watched
    pub rumination_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    pub sessions: Vec<VideoSession>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExamScore {
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisScore {
    pub comprehensive_score: f64,
    pub course_points: f64,
}

/// One student's activity across all tracked categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub homework: Presence<HomeworkScores>,
    #[serde(default)]
    pub discussion: Presence<DiscussionStats>,
    #[serde(default)]
    pub video: Presence<VideoStats>,
    #[serde(default)]
    pub exam: Presence<ExamScore>,
    #[serde(default)]
    pub synthesis: Presence<SynthesisScore>,
}

impl StudentRecord {
    /// Record with every category absent.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            homework: Presence::Absent,
            discussion: Presence::Absent,
            video: Presence::Absent,
            exam: Presence::Absent,
            synthesis: Presence::Absent,
        }
    }

    pub fn with_homework(mut self, scores: impl Into<Vec<f64>>) -> Self {
        self.homework = Presence::Present(HomeworkScores {
            scores: scores.into(),
        });
        self
    }

    pub fn with_discussion(mut self, posted: u32, replied: u32, upvotes: u32) -> Self {
        self.discussion = Presence::Present(DiscussionStats {
            posted,
            replied,
            upvotes,
        });
        self
    }

    /// `sessions` are `(watch_duration, rumination_ratio)` pairs.
    pub fn with_video(mut self, sessions: &[(f64, f64)]) -> Self {
        self.video = Presence::Present(VideoStats {
            sessions: sessions
                .iter()
                .map(|&(watch_duration, rumination_ratio)| VideoSession {
                    watch_duration,
                    rumination_ratio,
                })
                .collect(),
        });
        self
    }

    pub fn with_exam(mut self, score: f64) -> Self {
        self.exam = Presence::Present(ExamScore { score });
        self
    }

    pub fn with_synthesis(mut self, comprehensive_score: f64, course_points: f64) -> Self {
        self.synthesis = Presence::Present(SynthesisScore {
            comprehensive_score,
            course_points,
        });
        self
    }

    /// Comprehensive score usable as a regression target (present and > 0).
    pub fn target_score(&self) -> Option<f64> {
        self.synthesis
            .as_option()
            .map(|s| s.comprehensive_score)
            .filter(|s| s.is_finite() && *s > 0.0)
    }
}
