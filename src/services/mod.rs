pub mod alert;
pub mod clock;
pub mod email;
pub mod gateway;
pub mod hashing;
pub mod metrics;
pub mod otp;
pub mod phone;
pub mod rate_limit;
pub mod security;
pub mod sms;
pub mod templates;
pub mod token;
