mod auth_screen;
mod date_picker;
mod notice_banner;
mod settings_modal;
mod sidebar;
mod task_section;

pub use auth_screen::{
  AuthRequest,
  AuthScreen
};
pub use date_picker::DatePicker;
pub use notice_banner::NoticeBanner;
pub use settings_modal::SettingsModal;
pub use sidebar::Sidebar;
pub use task_section::TaskSection;
