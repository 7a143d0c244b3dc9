pub mod events;
pub mod favourites;
pub mod home;
pub mod reviews;
pub mod search;
pub mod users;
pub mod votes;
