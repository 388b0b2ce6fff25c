pub mod aggregate;
pub mod bitmap;
pub mod config;
pub mod error;
pub mod input;
pub mod repository;
pub mod service;
pub mod slot;
pub mod week;

pub use aggregate::{AggregateVector, EventAvailability, Heatmap, WeekAggregate};
pub use config::StoreConfig;
pub use error::{AvailabilityError, BitmapError, SlotError, StoreError, ValidationError};
pub use input::{DateSubmission, EventSubmission, Submission, WeeklySubmission};
pub use repository::{
    BitmapKey, BlobStore, MemoryBlobStore, MemoryScheduleRepository, ScheduleRepository,
};
pub use slot::{SlotInput, SlotVector, SLOTS_PER_DAY};
pub use week::{WeekSchedule, Weekday};
