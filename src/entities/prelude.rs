pub use super::pages::Entity as Pages;
pub use super::users::Entity as Users;
