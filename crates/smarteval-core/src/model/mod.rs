//! Entities swept by the engines.

pub mod assessment;
pub mod student;
pub mod task;
pub mod window;

pub use assessment::{Assessment, AssessmentStatus};
pub use student::Student;
pub use task::{Task, TaskExpiryPolicy, TaskPriority, TaskStatus};
pub use window::{
    classify_window, horizon_end, latest_instant, EntityKind, TimeWindow, TimeWindowed,
    WindowPhase,
};
