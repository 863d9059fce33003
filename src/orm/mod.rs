pub mod messages;
pub mod subjects;
pub mod users;
