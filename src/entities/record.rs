use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One stored record of any collection, with the record body kept as JSON.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub collection: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Position within the collection; preserves creation order.
    pub position: i64,
    #[sea_orm(nullable)]
    pub unique_key: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub body: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
