pub mod answer;
pub mod docs;
