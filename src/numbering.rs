//! Card id allocation.
//!
//! Main topics are numbered `1, 2, 3, ...`, frequently-accessed file cards
//! `A1, A2, ...` and quotes `Z1, Z2, ...`. A subtopic appends the first
//! unused letter to its parent (`1a`, `1b`, ...). Prefixes and counters come
//! from the rule source and fall back to this built-in table when it is
//! missing or malformed.

mod allocator;
mod rules;
mod scheme;

pub use allocator::NumberingAllocator;
pub use rules::{Counter, NumberingRule, NumberingRules, UNKNOWN_FILE_CATEGORY};
pub use scheme::{NumberingScheme, next_subtopic_letter};
