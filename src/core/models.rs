pub mod attendee;
pub mod common;
pub mod demographic;
pub mod event;
pub mod event_attendee;
pub mod organization;
pub mod question;
pub mod response;
