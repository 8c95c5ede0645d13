//! SeaORM Entity for user_friends table
//!
//! One row per friendship, oriented from requester (`user_id`) to
//! addressee (`friend_id`). `pair_low`/`pair_high` hold the same two ids
//! in ascending order and carry the unique index, so a pair has one row
//! whichever side asked first.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "user_friends")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub friend_id: i32,
    #[serde(skip)]
    pub pair_low: i32,
    #[serde(skip)]
    pub pair_high: i32,
    pub status: FriendshipStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Requester,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FriendId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Addressee,
}

impl ActiveModelBehavior for ActiveModel {}

/// The two ids of a friendship in index order.
pub fn pair(a: i32, b: i32) -> (i32, i32) {
    (a.min(b), a.max(b))
}

impl Model {
    /// The participant that is not `user_id`.
    pub fn other_party(&self, user_id: i32) -> i32 {
        if self.user_id == user_id {
            self.friend_id
        } else {
            self.user_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_ignores_direction() {
        assert_eq!(pair(7, 3), (3, 7));
        assert_eq!(pair(3, 7), pair(7, 3));
    }
}
