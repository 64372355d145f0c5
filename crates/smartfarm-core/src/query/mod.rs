// ── Query cache layer ──
//
// Keys, entries, the shared cache itself, and the two consumers built
// on top of it: observers for paged/filtered views and pollers for
// long-running jobs.

mod cache;
mod entry;
mod key;
mod observer;
mod poll;

pub use cache::{CacheEvent, QueryCache};
pub use entry::{EntryState, QueryStatus};
pub use key::QueryKey;
pub use observer::{QueryObserver, QueryResult};
pub use poll::{PollHandle, poll};
