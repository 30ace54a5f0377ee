pub mod course;
pub mod document;
pub mod suggestion;
pub mod time_serde;

mod error;

pub use course::{Course, CourseLevel, CourseStatus};
pub use document::{SearchDocument, to_search_document};
pub use error::TransformError;
