pub mod documents;
pub mod email;
pub mod health;
