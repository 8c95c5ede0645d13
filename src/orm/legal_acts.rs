//! SeaORM Entity for legal_acts table
//!
//! Natural key: (title, jurisdiction).

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Category used for Criminal Code sections.
pub const CATEGORY_CRIMINAL_CODE: &str = "criminal-code";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "legal_acts")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub act_number: Option<String>,
    pub jurisdiction: String,
    pub category: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub enacted_date: Option<Date>,
    pub last_amended: Option<Date>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
