pub mod accounts;
pub mod daps;
pub mod pagination;
pub mod ranking;
pub mod reports;
pub mod upload;

pub use accounts::{complete_login, LoginError, LoginIdentity};
pub use daps::{can_administrate, can_maintain, delete_metadap, delete_version, refresh_latest};
pub use pagination::{Page, PageError};
pub use ranking::{get_rank, rank_dap};
pub use reports::file_report;
pub use upload::{handle_uploaded_dap, UploadError};
