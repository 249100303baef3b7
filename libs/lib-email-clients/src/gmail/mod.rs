pub mod api_quota;
