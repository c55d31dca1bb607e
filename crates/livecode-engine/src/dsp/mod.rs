pub mod effect;
pub mod rectify;
