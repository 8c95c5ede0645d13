//! SeaORM Entity for electoral_candidates table

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "electoral_candidates")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub election_id: i32,
    pub name: String,
    pub party: Option<String>,
    pub riding: Option<String>,
    pub is_incumbent: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub platform: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::elections::Entity",
        from = "Column::ElectionId",
        to = "super::elections::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Election,
    #[sea_orm(has_many = "super::candidate_policies::Entity")]
    Policies,
}

impl Related<super::elections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Election.def()
    }
}

impl Related<super::candidate_policies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Policies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
