//! # Twin Core
//!
//! Record pairing over a bounded-recency buffer.
//!
//! ## Design Principles
//! - One owner: the buffer lives on the matcher thread only
//! - Expiry before every scoring pass, as a single suffix trim
//! - Oldest entry wins among equal scores
//! - Monotonic time only (no SystemTime)

pub mod time;
pub mod record;
pub mod buffer;
pub mod engine;
pub mod sink;
pub mod worker;

pub use time::{Clock, MonotonicClock, Timestamp};
pub use record::{Record, Score};
pub use buffer::{BufferEntry, Candidate, RecencyBuffer};
pub use engine::{
    EngineConfig, EngineStats, MalformedPolicy, Match, MatchEngine, Outcome, Processed,
    DEFAULT_DELAY,
};
pub use sink::{dispatch, EngineEvent, EventSink, TracingSink};
pub use worker::{MatcherWorker, StopReason, WorkerReport};
