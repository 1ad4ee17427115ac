pub mod contact_dto;
pub mod message_dto;
pub mod settings_dto;
pub mod template_dto;
