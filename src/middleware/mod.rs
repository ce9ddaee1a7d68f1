/// Middleware module
///
/// Provides JWT authentication middleware for protected routes.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
