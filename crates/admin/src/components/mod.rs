//! View components shared by several pages.

pub mod chart;
pub mod pager;

pub use chart::{Bar, BarSeries};
pub use pager::PagerView;
