mod common;
mod confirm_dialog;
mod explorer;
mod finish;
mod home;
mod progress;

pub use confirm_dialog::render_confirm_dialog;
pub use explorer::render_explorer;
pub use finish::render_finish;
pub use home::render_home;
pub use progress::render_progress;
