//! 传输层：HTTP 上传、响应和暂存文件清理

pub mod error;
pub mod handlers;
pub mod router;
pub mod upload;

pub use error::ApiError;
pub use router::{build_router, serve, AppState};
