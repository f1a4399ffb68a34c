pub mod model;
pub mod shape;

pub use model::*;
pub use shape::*;
