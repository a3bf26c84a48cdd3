pub mod backend;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod confirm;
pub mod error;
pub mod feed;
pub mod model;
pub mod paths;
pub mod preferences;
pub mod selector;
pub mod session;
pub mod workspace;
pub mod years;

pub use backend::{
  connect,
  Backend,
  MemoryService,
  MemorySession,
  Persistence
};
pub use config::Config;
pub use error::ActionError;
pub use workspace::{
  NoticeSlot,
  Runtime,
  Workspace
};
