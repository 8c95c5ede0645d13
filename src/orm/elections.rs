//! SeaORM Entity for elections table
//!
//! Natural key: (election_type, jurisdiction, title).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "ongoing")]
    Ongoing,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl ElectionStatus {
    /// Status of an election held on `date`, as seen on `today`.
    pub fn for_date(date: Date, today: Date) -> Self {
        match date.cmp(&today) {
            std::cmp::Ordering::Greater => ElectionStatus::Upcoming,
            std::cmp::Ordering::Equal => ElectionStatus::Ongoing,
            std::cmp::Ordering::Less => ElectionStatus::Completed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "elections")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// federal | provincial | municipal | by-election
    pub election_type: String,
    pub jurisdiction: String,
    pub title: String,
    pub election_date: Date,
    pub status: ElectionStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub registration_deadline: Option<Date>,
    pub advance_voting_start: Option<Date>,
    pub advance_voting_end: Option<Date>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::electoral_candidates::Entity")]
    Candidates,
}

impl Related<super::electoral_candidates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
