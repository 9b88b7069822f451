//! Domain entities - core business objects

mod event;
mod member;
mod rank;
mod role;
mod stat;
mod user;

pub use event::{Event, EventKind, EventRecord, NewEvent};
pub use member::MemberSnapshot;
pub use rank::{Rank, RankTable, RoleFilter};
pub use role::{Role, RoleSnapshot};
pub use stat::{StatDelta, StatKind, UserStats};
pub use user::User;
