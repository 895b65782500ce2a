pub mod providers;
pub mod request_id;
