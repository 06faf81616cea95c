//! Query Builder pagination operations

use crate::model::Entity;

use super::builder::QueryBuilder;

impl<E: Entity> QueryBuilder<E> {
    /// Add LIMIT clause
    pub fn limit(mut self, count: u64) -> Self {
        self.plan.limit = Some(count);
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: u64) -> Self {
        self.plan.offset = Some(count);
        self
    }

    /// Add pagination (LIMIT + OFFSET); pages start at 1
    pub fn paginate(mut self, per_page: u64, page: u64) -> Self {
        self.plan.limit = Some(per_page);
        self.plan.offset = Some(page.saturating_sub(1).saturating_mul(per_page));
        self
    }
}
