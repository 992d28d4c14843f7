pub mod auth;
pub mod cors;
pub mod jwt;

pub use auth::{AuthUser, UserRole};
pub use cors::create_cors_layer;
pub use jwt::{Claims, SupabaseJwt};
