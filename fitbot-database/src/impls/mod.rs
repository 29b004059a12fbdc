pub mod event_logs;
pub mod profiles;
