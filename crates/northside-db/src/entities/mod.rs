pub mod event;
pub mod event_member;
pub mod favourite_song;
pub mod song_review;
pub mod user;
pub mod voted_song;
