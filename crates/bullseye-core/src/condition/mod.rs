pub mod conditioner;
pub mod exposure;

pub use conditioner::{ConditionedFrame, Conditioner};
pub use exposure::{auto_expose, exposure_level};
