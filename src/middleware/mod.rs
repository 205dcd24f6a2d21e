pub mod auth;
pub mod cookies;
pub mod flash;
pub mod response;

pub use auth::{session_middleware, Session};
pub use flash::{FlashMessage, FlashRedirect, Level};
pub use response::{ApiResponse, ApiResult, Page, PageResult};
