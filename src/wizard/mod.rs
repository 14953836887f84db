pub mod feedback;
pub mod generation;
pub mod lock;
pub mod navigation;
pub mod persistence;
pub mod steps;
pub mod validation;
