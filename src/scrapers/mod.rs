pub mod guild_members;
pub mod match_history;
pub mod profile_page;
