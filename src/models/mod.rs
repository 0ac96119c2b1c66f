pub mod notification;
pub mod save_record;
pub mod status;
