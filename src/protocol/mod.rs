//! Wire types shared with the duel server and the judge.

mod messages;

pub use messages::*;
