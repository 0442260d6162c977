pub mod draft;

pub use draft::{CommitOutcome, DraftManager, SentReceipt, SessionContext};
