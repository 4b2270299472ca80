//! Tenant credential entity model
//!
//! This module contains the SeaORM entity model for the tenants table, the
//! durable mapping from seller account to its OAuth token pair.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// One row per seller account integrated with the bot
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Marketplace user id of the seller (primary key, provider-assigned)
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: i64,

    /// Bearer token used for all marketplace calls on behalf of this seller
    pub access_token: String,

    /// Token used to mint new access tokens; persisted for future use, the
    /// refresh flow itself is not part of the webhook pipeline
    pub refresh_token: String,

    /// Inactive tenants are skipped by the orchestrator; flipped by an
    /// administrator, never by the pipeline
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
