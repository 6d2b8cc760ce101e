pub mod contributors;
pub mod dashboard;
pub mod members;
