//! Request-level operations over the review store and classifier gateway.

mod error;
pub mod rank;
pub mod read;
pub mod schedule;
pub mod submit;

#[cfg(test)]
mod testing;

pub use error::ServiceError;
pub use rank::{RankingSelector, RerankReport};
pub use read::ReadAssembler;
pub use schedule::{BusinessOutcome, DailyReport, SchedulerDriver};
pub use submit::{ReviewSubmission, SubmitOutcome, Submitter};
