pub mod plans;
pub mod users;
