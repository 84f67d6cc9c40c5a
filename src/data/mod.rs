pub mod observation;
pub mod preprocessing;
pub mod source;
pub mod synthetic;
