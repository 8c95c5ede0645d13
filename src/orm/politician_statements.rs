//! SeaORM Entity for politician_statements table

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "politician_statements")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub politician_id: i32,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub source: Option<String>,
    pub statement_date: Option<Date>,
    /// Set once a moderator has fact-checked the statement as accurate.
    pub is_verified: bool,
    pub created_by: Option<i32>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::politicians::Entity",
        from = "Column::PoliticianId",
        to = "super::politicians::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Politician,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Author,
}

impl Related<super::politicians::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Politician.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
