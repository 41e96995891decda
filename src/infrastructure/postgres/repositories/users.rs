use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::users::{SubscriptionSyncChangeset, UserEntity, UserRow},
        repositories::users::UserRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::users},
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .find(user_id)
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?;

        Ok(result.map(UserEntity::from))
    }

    async fn sync_subscription_from_provider(
        &self,
        user_id: Uuid,
        changeset: SubscriptionSyncChangeset,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(users::table)
            .filter(users::id.eq(user_id))
            .set((&changeset, users::updated_at.eq(Utc::now())))
            .execute(&mut conn)?;

        Ok(affected)
    }

    async fn mark_subscription_canceled(
        &self,
        user_id: Uuid,
        canceled_at: Option<DateTime<Utc>>,
        reason: Option<String>,
    ) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(users::table)
            .filter(users::id.eq(user_id))
            .set((
                users::cancelation_status.eq(true),
                users::cancelation_date.eq(canceled_at),
                users::cancelation_reason.eq(reason),
                users::is_active.eq(false),
                users::is_active_by_admin.eq(false),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)?;

        Ok(result.into())
    }
}
