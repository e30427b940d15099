pub mod api;
pub mod ballot;
pub mod mongodb;
pub mod roster;
pub mod session;
pub mod store;
pub mod tally;
pub mod voter;
