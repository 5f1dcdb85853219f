pub mod catalog;
pub mod game;
pub mod health;
pub mod leaderboard;
pub mod phase;
pub mod session;
pub mod validation;
