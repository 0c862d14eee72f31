//! Presentation seam.
//!
//! The engine never draws anything itself; it tells a [`RenderGateway`] what
//! changed. Hosts implement the trait for their UI, tests use
//! [`RecordingGateway`].

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use course_core::ProgressView;
use course_core::access::LessonNavItem;
use course_core::model::AchievementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub trait RenderGateway: Send + Sync {
    fn show_notification(&self, message: &str, severity: Severity);

    fn refresh_progress_display(&self, view: &ProgressView);

    fn refresh_lesson_navigation(&self, lessons: &[LessonNavItem]);

    fn render_achievements(&self, achievements: &BTreeSet<AchievementId>);
}

/// Discards every call. For headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGateway;

impl RenderGateway for NullGateway {
    fn show_notification(&self, _message: &str, _severity: Severity) {}

    fn refresh_progress_display(&self, _view: &ProgressView) {}

    fn refresh_lesson_navigation(&self, _lessons: &[LessonNavItem]) {}

    fn render_achievements(&self, _achievements: &BTreeSet<AchievementId>) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Notification { message: String, severity: Severity },
    ProgressDisplay(ProgressView),
    LessonNavigation(Vec<LessonNavItem>),
    Achievements(BTreeSet<AchievementId>),
}

/// Keeps every call in order. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingGateway {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
}

impl RecordingGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().clone()
    }

    /// Notifications shown so far, oldest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<(String, Severity)> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Notification { message, severity } => {
                    Some((message.clone(), *severity))
                }
                _ => None,
            })
            .collect()
    }

    /// The most recent progress view, if any was rendered.
    #[must_use]
    pub fn last_progress(&self) -> Option<ProgressView> {
        self.lock().iter().rev().find_map(|call| match call {
            GatewayCall::ProgressDisplay(view) => Some(view.clone()),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<GatewayCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: GatewayCall) {
        self.lock().push(call);
    }
}

impl RenderGateway for RecordingGateway {
    fn show_notification(&self, message: &str, severity: Severity) {
        self.record(GatewayCall::Notification {
            message: message.to_owned(),
            severity,
        });
    }

    fn refresh_progress_display(&self, view: &ProgressView) {
        self.record(GatewayCall::ProgressDisplay(view.clone()));
    }

    fn refresh_lesson_navigation(&self, lessons: &[LessonNavItem]) {
        self.record(GatewayCall::LessonNavigation(lessons.to_vec()));
    }

    fn render_achievements(&self, achievements: &BTreeSet<AchievementId>) {
        self.record(GatewayCall::Achievements(achievements.clone()));
    }
}
