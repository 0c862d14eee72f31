#![forbid(unsafe_code)]

pub mod course_services;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod notes;
pub mod progress_store;
pub mod time_tracker;

pub use course_core::Clock;

pub use course_services::CourseServices;
pub use engine::{ProgressionEngine, SharedEngine};
pub use error::{CourseServicesError, EngineError};
pub use gateway::{GatewayCall, NullGateway, RecordingGateway, RenderGateway, Severity};
pub use notes::NotesDebouncer;
pub use progress_store::ProgressStore;
pub use time_tracker::TimeTracker;
