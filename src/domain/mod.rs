pub mod branch;
pub mod report;
pub mod requirement;
pub mod state;
pub mod ticket;
