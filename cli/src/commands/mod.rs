pub mod assessment;
pub mod health;
