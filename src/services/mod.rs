pub mod broadcast;
pub mod voting;
