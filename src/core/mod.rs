pub mod align;
pub mod annotation;
pub mod engine;
pub mod error;
pub mod genes;
pub mod io;
pub mod matrix;
pub mod model;
pub mod stats;
pub mod table;
