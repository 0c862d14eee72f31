#![forbid(unsafe_code)]

pub mod access;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod progression;
pub mod time;
pub mod view;

pub use error::Error;
pub use time::Clock;

pub use access::{AccessPolicy, LessonNavItem, LessonStatus, can_access};
pub use evaluator::{AnswerSheet, EvaluationError, QuizScore, check_answer, evaluate};
pub use progression::{ProgressEvent, Progression, ProgressionError, Transition};
pub use view::ProgressView;
