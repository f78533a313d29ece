pub mod job;
pub mod message;
pub mod table;

pub use job::{ImageCandidateSet, JobRequest, PlaceCoords, PlaceRecord};
pub use message::{Inbound, InitPayload, StatusKind, StatusMessage};
pub use table::{ImageRow, ImageTable, ReviewRow, ReviewTable};
