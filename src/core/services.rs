pub mod attendee;
pub mod demographic;
pub mod event;
pub mod organization;
pub mod question;
pub mod registration;
