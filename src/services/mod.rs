pub mod auth_service;
pub use auth_service::{AuthError, AuthService, Registration};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod password;

pub mod search;
pub use search::{SearchError, SearchService};

pub mod weather;
pub use weather::WeatherService;
