pub mod error;
pub mod graph;
pub mod mst;
pub mod planners;
pub mod search;
