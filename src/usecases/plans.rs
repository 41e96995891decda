use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::domain::{repositories::plans::PlanRepository, value_objects::plans::PlanDto};

/// Read-only view over the subscription catalog.
pub struct PlanUseCase<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
}

impl<P> PlanUseCase<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(plan_repo: Arc<P>) -> Self {
        Self { plan_repo }
    }

    pub async fn list_plans(&self) -> Result<Vec<PlanDto>> {
        let plans = self.plan_repo.list_active_plans().await?;
        debug!(plan_count = plans.len(), "plans: active plans loaded");
        Ok(plans.into_iter().map(PlanDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use anyhow::anyhow;
    use uuid::Uuid;

    use crate::domain::{
        entities::plans::PlanEntity,
        repositories::plans::MockPlanRepository,
        value_objects::plans::PlanFeatures,
    };

    fn sample_plan(title: &str) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            title: title.to_string(),
            price: 1500,
            yearly_discount: None,
            description: Some("sample".to_string()),
            features: PlanFeatures::default(),
            max_images_allowed: 50,
            stripe_price_keys: HashMap::from([("month".to_string(), "price_abc".to_string())]),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn lists_active_plans_as_dtos() {
        let mut plan_repo = MockPlanRepository::new();
        let plans = vec![sample_plan("Starter"), sample_plan("Pro")];

        plan_repo.expect_list_active_plans().returning(move || {
            let plans = plans.clone();
            Box::pin(async move { Ok(plans) })
        });

        let usecase = PlanUseCase::new(Arc::new(plan_repo));

        let dtos = usecase.list_plans().await.unwrap();

        assert_eq!(dtos.len(), 2);
        assert_eq!(dtos[0].title, "Starter");
        assert_eq!(dtos[1].title, "Pro");
    }

    #[tokio::test]
    async fn propagates_repository_failure() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_list_active_plans()
            .returning(|| Box::pin(async { Err(anyhow!("connection refused")) }));

        let usecase = PlanUseCase::new(Arc::new(plan_repo));

        assert!(usecase.list_plans().await.is_err());
    }
}
