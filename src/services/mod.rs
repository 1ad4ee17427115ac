pub mod audit_service;
pub mod meta_service;
pub mod send_service;
pub mod settings_service;
pub mod store;
pub mod template_service;
