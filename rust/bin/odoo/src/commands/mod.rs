pub mod context;
pub mod login;
pub mod model;
