use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub invitation_id: String,
}

#[derive(Debug)]
pub enum IdentityError {
    Http(String),
    Status(u16, String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Http(msg) => write!(f, "identity provider unreachable: {}", msg),
            IdentityError::Status(code, body) => {
                write!(f, "identity provider returned {}: {}", code, body)
            }
        }
    }
}

impl std::error::Error for IdentityError {}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn lookup_users(&self, user_ids: &[String]) -> Result<Vec<IdentityProfile>, IdentityError>;
    async fn create_invitation(
        &self,
        email: &str,
        organization_code: &str,
        course_id: &str,
    ) -> Result<Invitation, IdentityError>;
    async fn revoke_invitation(&self, invitation_id: &str) -> Result<(), IdentityError>;
}

/// Client for the hosted identity service.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn lookup_users(&self, user_ids: &[String]) -> Result<Vec<IdentityProfile>, IdentityError> {
        let resp = self
            .client
            .post(self.url("/v1/users/lookup"))
            .bearer_auth(&self.api_key)
            .json(&json!({ "userIds": user_ids }))
            .send()
            .await
            .map_err(|e| IdentityError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Status(status.as_u16(), body));
        }
        #[derive(Deserialize)]
        struct LookupResponse {
            users: Vec<IdentityProfile>,
        }
        let parsed: LookupResponse = resp
            .json()
            .await
            .map_err(|e| IdentityError::Http(e.to_string()))?;
        Ok(parsed.users)
    }

    async fn create_invitation(
        &self,
        email: &str,
        organization_code: &str,
        course_id: &str,
    ) -> Result<Invitation, IdentityError> {
        let resp = self
            .client
            .post(self.url("/v1/invitations"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "email": email,
                "metadata": {
                    "organizationCode": organization_code,
                    "courseId": course_id,
                }
            }))
            .send()
            .await
            .map_err(|e| IdentityError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Status(status.as_u16(), body));
        }
        resp.json()
            .await
            .map_err(|e| IdentityError::Http(e.to_string()))
    }

    async fn revoke_invitation(&self, invitation_id: &str) -> Result<(), IdentityError> {
        let resp = self
            .client
            .delete(self.url(&format!("/v1/invitations/{}", invitation_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| IdentityError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Status(status.as_u16(), body));
        }
        Ok(())
    }
}

/// Placeholder used when the identity service is unavailable. Reports still
/// render; the name is derived from the identifier.
pub fn placeholder_profile(user_id: &str) -> IdentityProfile {
    let prefix: String = user_id.chars().take(8).collect();
    IdentityProfile {
        user_id: user_id.to_string(),
        display_name: format!("Student {}", prefix),
        email: None,
    }
}

/// Maps user ids to profiles, falling back to placeholders for any id the
/// provider does not return or when the provider call fails outright.
pub async fn enrich_profiles(
    provider: &dyn IdentityProvider,
    user_ids: &[String],
) -> Vec<IdentityProfile> {
    let looked_up = match provider.lookup_users(user_ids).await {
        Ok(profiles) => profiles,
        Err(e) => {
            warn!(event = "identity_lookup_failed", error = %e);
            Vec::new()
        }
    };
    user_ids
        .iter()
        .map(|id| {
            looked_up
                .iter()
                .find(|p| p.user_id == *id)
                .cloned()
                .unwrap_or_else(|| placeholder_profile(id))
        })
        .collect()
}
