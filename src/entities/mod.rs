pub mod prelude;

pub mod pages;
pub mod users;
