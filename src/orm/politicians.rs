//! SeaORM Entity for politicians table
//!
//! Natural key: (name, level, jurisdiction), backed by a unique index created
//! in [`crate::db::create_schema`].

use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Tally of recorded votes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct VotingRecord {
    pub yes: i64,
    pub no: i64,
    pub abstain: i64,
}

impl VotingRecord {
    pub fn total(&self) -> i64 {
        self.yes
            .max(0)
            .saturating_add(self.no.max(0))
            .saturating_add(self.abstain.max(0))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
    pub website: Option<String>,
}

/// Annual expense disclosure, in dollars.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Expenses {
    pub travel: f64,
    pub hospitality: f64,
    pub office: f64,
    pub total: f64,
    pub year: Option<i32>,
}

/// JSON array of strings (committee names, policy positions).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for StringList {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "politicians")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub party: Option<String>,
    pub position: Option<String>,
    pub riding: Option<String>,
    /// federal | provincial | municipal
    pub level: String,
    pub jurisdiction: String,
    pub trust_score: i32,
    pub civic_level: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub policy_positions: StringList,
    #[sea_orm(column_type = "Json")]
    pub voting_record: VotingRecord,
    #[sea_orm(column_type = "Json")]
    pub contact_info: ContactInfo,
    #[sea_orm(column_type = "Json")]
    pub committees: StringList,
    #[sea_orm(column_type = "Json")]
    pub expenses: Expenses,
    pub is_incumbent: bool,
    pub parliament_member_id: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::politician_statements::Entity")]
    Statements,
}

impl Related<super::politician_statements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Statements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
