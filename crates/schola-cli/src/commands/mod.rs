pub mod dispatch;
pub mod facts;
pub mod schedule;
pub mod section;
pub mod shared;
pub mod subject;
