use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use belay_core::completed::CompletedWorkout;
use belay_core::sessions::ActivityType;

/// Client for the hosted workout-memory service. The core treats this
/// collaborator as a black box: completed workouts go in (`store`), ranked
/// records come back out (`search`). Service internals are not our problem;
/// failures surface to callers as `memory_unavailable`.
#[derive(Clone)]
pub struct MemoryClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// One ranked record from a history search.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScoredRecord {
    pub score: f64,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Ranked search results, best first (ordering is the service's).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResults {
    pub results: Vec<ScoredRecord>,
}

impl MemoryClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Configuration from `MEMORY_API_URL` / `MEMORY_API_KEY`. A missing
    /// key is not fatal at startup; requests will fail and surface as
    /// `memory_unavailable` until it is set.
    pub fn from_env() -> Self {
        let base_url = std::env::var("MEMORY_API_URL")
            .unwrap_or_else(|_| "https://api.supermemory.ai".to_string());
        let api_key = std::env::var("MEMORY_API_KEY").unwrap_or_default();
        Self::new(base_url, api_key)
    }

    /// Store a completed workout as a historical fact, tagged by activity
    /// so coaches can filter their own specialty later.
    pub async fn store(
        &self,
        user_id: &str,
        workout: &CompletedWorkout,
    ) -> Result<(), reqwest::Error> {
        let activity = workout.activity().as_str();
        let content = format!("user_{user_id}:\n{}", workout.to_wire());
        let body = json!({
            "content": content,
            "containerTags": [activity],
            "metadata": {
                "user": user_id,
                "date": workout.date().format("%Y-%m-%d").to_string(),
                "activity": activity,
            }
        });

        self.http
            .post(format!("{}/v3/memories", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(user = user_id, activity, "stored completed workout");
        Ok(())
    }

    /// Ranked search over a user's workout history, filtered to one
    /// activity.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        activity: ActivityType,
        limit: u32,
    ) -> Result<SearchResults, reqwest::Error> {
        let body = json!({
            "q": query,
            "limit": limit,
            "rerank": true,
            "containerTags": [activity.as_str()],
            "filters": {
                "AND": [{"key": "user", "value": user_id}]
            }
        });

        let results = self
            .http
            .post(format!("{}/v3/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResults>()
            .await?;

        tracing::info!(
            user = user_id,
            activity = activity.as_str(),
            hits = results.results.len(),
            "searched workout history"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let client = MemoryClient::new("https://memory.example/", "key");
        assert_eq!(client.base_url, "https://memory.example");
    }

    #[test]
    fn scored_records_tolerate_missing_metadata() {
        let results: SearchResults = serde_json::from_value(serde_json::json!({
            "results": [{"score": 0.92, "content": "user_abc: 12km tempo"}]
        }))
        .unwrap();
        assert_eq!(results.results.len(), 1);
        assert!(results.results[0].metadata.is_null());
    }
}
