pub mod automation_log;
pub mod contact;
pub mod message;
pub mod setting;
pub mod template;
