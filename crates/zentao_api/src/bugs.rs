//! Narrows a product's bug list down to the bugs assigned to the logged-in user.

use tracing::info;

use crate::client::ZentaoClient;
use crate::error::{Result, ZentaoError};
use crate::models::Bug;

/// Keeps the bugs whose assignee display name equals `realname`, in tracker order.
pub fn filter_assigned_to(bugs: &[Bug], realname: &str) -> Vec<Bug> {
    bugs.iter()
        .filter(|bug| bug.assignee_realname() == Some(realname))
        .cloned()
        .collect()
}

impl ZentaoClient {
    /// Fetches the product's bugs and keeps the ones assigned to the current user.
    ///
    /// The user's display name is fetched first when it is not cached yet.
    /// Only the first page (`bug_page_limit` items) is considered.
    pub async fn fetch_unresolved_for_current_user(&self, product_id: &str) -> Result<Vec<Bug>> {
        if product_id.trim().is_empty() {
            return Err(ZentaoError::precondition("no product selected"));
        }

        let realname = match self.session().realname() {
            Some(name) => name,
            None => self
                .fetch_user_info()
                .await?
                .display_name()
                .map(str::to_string)
                .ok_or_else(|| ZentaoError::Other("user profile has no realname".into()))?,
        };

        let bugs = self.fetch_bugs(product_id).await?;
        let mine = filter_assigned_to(&bugs, &realname);
        info!(total = bugs.len(), assigned = mine.len(), "Unresolved bugs filtered");
        Ok(mine)
    }
}
