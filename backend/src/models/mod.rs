pub mod item;
pub mod timestamp;

pub use item::*;
