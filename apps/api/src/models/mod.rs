pub mod competency;
pub mod journey;
pub mod sprint;
pub mod workspace;
