pub mod phone;
pub mod session_window;
pub mod time;
