// Bot pull request aggregation.
// Display records, the multi-repository aggregator, and the retry wrapper.

pub mod aggregate;
pub mod record;
pub mod retry;

pub use aggregate::{Aggregator, FetchAllResult, RepoError, UNKNOWN_ERROR};
pub use record::PullRequestRecord;
pub use retry::{LogOnly, RetryHandler, RetryPolicy, run_with_retry};
