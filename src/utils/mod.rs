pub mod aggregate;
pub mod data;
pub mod roster;
pub mod xp_calculator;
