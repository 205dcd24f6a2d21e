pub mod dap;
pub mod metadap;
pub mod rank;
pub mod report;
pub mod social;
pub mod tag;
pub mod user;

pub use dap::{Dap, NewDap};
pub use metadap::{MetaDap, MetaDapOrder, MetaDapQuery};
pub use rank::Rank;
pub use report::{NewReport, Problem, Report};
pub use social::SocialAuth;
pub use tag::{NewTag, Tag};
pub use user::{NewUser, User};
