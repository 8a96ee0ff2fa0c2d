//! Deterministic cohort builders shared by the integration tests.
#![allow(dead_code)]

use cohort_insight::records::StudentRecord;

/// A fully populated student whose activity scales with `level` (0..=1).
pub fn student(id: &str, level: f64, jitter: f64) -> StudentRecord {
    let base = 40.0 + 55.0 * level;
    let homework: Vec<f64> = (0..8)
        .map(|k| {
            let v = base + jitter * ((k % 3) as f64 - 1.0) * 3.0;
            v.max(1.0).min(100.0)
        })
        .collect();
    let posts = (level * 8.0).round() as u32;
    let replies = (level * 6.0).round() as u32 + 1;
    let upvotes = (level * 10.0).round() as u32;
    let videos: Vec<(f64, f64)> = (0..5)
        .map(|k| (30.0 + 60.0 * level + k as f64 * jitter, 0.1 + 0.02 * k as f64))
        .collect();
    StudentRecord::new(id)
        .with_homework(homework)
        .with_discussion(posts, replies, upvotes)
        .with_video(&videos)
        .with_exam(base - 2.0)
        .with_synthesis(base + jitter, base - 5.0)
}

/// `n` students spread evenly across activity levels.
pub fn cohort(n: usize) -> Vec<StudentRecord> {
    (0..n)
        .map(|i| {
            let level = ((i * 37) % 100) as f64 / 100.0;
            let jitter = (i % 5) as f64 * 0.7;
            student(&format!("u{i:03}"), level, jitter)
        })
        .collect()
}

/// Student with nothing but an id.
pub fn empty_student(id: &str) -> StudentRecord {
    StudentRecord::new(id)
}

/// Five students: one with no homework and no discussion, two strong, two weak.
pub fn scenario_a() -> Vec<StudentRecord> {
    vec![
        StudentRecord::new("sparse").with_synthesis(45.0, 40.0),
        StudentRecord::new("strong-1")
            .with_homework(vec![78.0, 82.0, 80.0, 79.0, 81.0, 80.0, 83.0, 77.0])
            .with_discussion(6, 4, 9)
            .with_video(&[(80.0, 0.1), (75.0, 0.12), (90.0, 0.08)])
            .with_synthesis(84.0, 80.0),
        StudentRecord::new("strong-2")
            .with_homework(vec![81.0, 79.0, 84.0, 78.0, 80.0, 82.0, 76.0, 80.0])
            .with_discussion(5, 5, 7)
            .with_video(&[(70.0, 0.15), (85.0, 0.1), (88.0, 0.1)])
            .with_synthesis(82.0, 79.0),
        StudentRecord::new("weak-1")
            .with_homework(vec![50.0, 48.0, 52.0, 0.0, 51.0, 49.0, 50.0, 0.0])
            .with_discussion(1, 2, 0)
            .with_video(&[(30.0, 0.4), (25.0, 0.35)])
            .with_synthesis(55.0, 50.0),
        StudentRecord::new("weak-2")
            .with_homework(vec![47.0, 53.0, 0.0, 50.0, 52.0, 48.0, 0.0, 50.0])
            .with_discussion(0, 2, 1)
            .with_video(&[(35.0, 0.3), (20.0, 0.45)])
            .with_synthesis(52.0, 48.0),
    ]
}

/// Twenty students, half completing 2 of 5 assignments and half 7 of 8.
pub fn scenario_b() -> Vec<StudentRecord> {
    (0..20)
        .map(|i| {
            let low = i % 2 == 0;
            let wobble = (i % 4) as f64;
            let homework = if low {
                vec![55.0 + wobble, 0.0, 60.0 - wobble, 0.0, 0.0]
            } else {
                vec![85.0 + wobble, 88.0, 90.0 - wobble, 86.0, 0.0, 87.0, 89.0, 91.0]
            };
            let (posts, replies) = if low { (1, 1) } else { (6, 5) };
            StudentRecord::new(format!("b{i:02}"))
                .with_homework(homework)
                .with_discussion(posts, replies, i as u32 % 3)
                .with_video(&[(if low { 40.0 } else { 150.0 } + wobble * 5.0, 0.1)])
                .with_synthesis(if low { 58.0 } else { 86.0 } + wobble, 70.0)
        })
        .collect()
}

/// Seven students, six alike and one far below the rest on every axis.
pub fn scenario_c() -> Vec<StudentRecord> {
    let mut records: Vec<StudentRecord> = (0..6)
        .map(|i| {
            let d = i as f64;
            StudentRecord::new(format!("c{i}"))
                .with_homework(vec![80.0 + d, 82.0, 85.0 - d, 83.0, 81.0 + d, 84.0, 86.0, 80.0])
                .with_discussion(5, 4 + (i % 2) as u32, 6)
                .with_video(&[(60.0 + d, 0.1), (55.0, 0.1), (62.0 - d, 0.1), (58.0, 0.1), (61.0, 0.1)])
                .with_synthesis(82.0 + d, 80.0)
        })
        .collect();
    records.push(
        StudentRecord::new("outlier")
            .with_homework(vec![10.0, 0.0, 5.0, 0.0, 8.0, 0.0, 0.0, 0.0])
            .with_discussion(0, 0, 0)
            .with_video(&[(5.0, 0.0)])
            .with_synthesis(8.0, 5.0),
    );
    records
}
