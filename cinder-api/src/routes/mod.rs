pub mod admin;
pub mod debug;
pub mod health;
pub mod likes;
pub mod matches;
pub mod messages;
pub mod notifications;
pub mod profiles;
