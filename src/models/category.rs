use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{FieldValue, Searchable};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub title: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_categories::Relation::Book.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_categories::Relation::Category.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Searchable for crate::domain::Category {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "title" => (&self.title).into(),
            _ => FieldValue::Absent,
        }
    }
}
