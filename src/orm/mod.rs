//! SeaORM entities. One module per table.

pub mod candidate_policies;
pub mod electoral_candidates;
pub mod elections;
pub mod legal_acts;
pub mod legal_cases;
pub mod messages;
pub mod politician_statements;
pub mod politicians;
pub mod social_post_likes;
pub mod social_posts;
pub mod user_friends;
pub mod users;
