use rusqlite::Connection;

use crate::http::error::ApiError;

#[derive(Debug, Clone)]
pub struct OrgMember {
    pub user_id: String,
    pub organization_name: String,
}

/// Resolves the member set for an organization code. The code scopes what a
/// teacher may see, so an unknown or empty organization is a not-found.
pub fn members(conn: &Connection, organization_code: &str) -> Result<Vec<OrgMember>, ApiError> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, organization_name
             FROM organization_members
             WHERE organization_code = ?
             ORDER BY user_id",
        )
        .map_err(ApiError::db)?;
    let rows = stmt
        .query_map([organization_code], |r| {
            Ok(OrgMember {
                user_id: r.get(0)?,
                organization_name: r.get(1)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(ApiError::db)?;
    if rows.is_empty() {
        return Err(ApiError::not_found("organization not found or has no members"));
    }
    Ok(rows)
}

pub fn member_ids(members: &[OrgMember]) -> Vec<String> {
    members.iter().map(|m| m.user_id.clone()).collect()
}

/// Membership check for single-student endpoints.
pub fn require_member(members: &[OrgMember], user_id: &str) -> Result<(), ApiError> {
    if members.iter().any(|m| m.user_id == user_id) {
        Ok(())
    } else {
        Err(ApiError::not_found("student is not a member of this organization"))
    }
}
