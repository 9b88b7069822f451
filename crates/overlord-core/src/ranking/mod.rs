//! Rank resolution

mod resolver;

pub use resolver::{plan, resolve, RankPlan};
