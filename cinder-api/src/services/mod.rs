pub mod audit;
pub mod likes;
pub mod matches;
pub mod messages;
pub mod notifications;
pub mod profiles;
