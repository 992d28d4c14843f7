use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::profiles;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::run_blocking;

use super::jwt::extract_bearer_token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Hq,
    Branch,
    Viewer,
}

impl FromStr for UserRole {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "hq" => Ok(Self::Hq),
            "branch" => Ok(Self::Branch),
            "viewer" => Ok(Self::Viewer),
            other => Err(ApiError::Forbidden(format!(
                "알 수 없는 사용자 권한입니다: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = profiles)]
pub struct DbProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub managing_hq: Option<String>,
    pub managing_branch: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The signed-in user with the 본부/지사 scope from their profile row.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub managing_hq: Option<String>,
    pub managing_branch: Option<String>,
}

impl TryFrom<DbProfile> for AuthUser {
    type Error = ApiError;

    fn try_from(profile: DbProfile) -> Result<Self, Self::Error> {
        Ok(Self {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role.parse()?,
            managing_hq: profile.managing_hq,
            managing_branch: profile.managing_branch,
        })
    }
}

impl AuthUser {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }

    pub fn allows(&self, hq: &str, branch: &str) -> bool {
        if self.role == UserRole::Admin {
            return true;
        }
        let Some(own_hq) = self.managing_hq.as_deref() else {
            return false;
        };
        if own_hq != hq {
            return false;
        }
        match (self.role, self.managing_branch.as_deref()) {
            (UserRole::Hq, _) => true,
            (UserRole::Branch, Some(own_branch)) => own_branch == branch,
            (UserRole::Branch, None) => false,
            (UserRole::Viewer, Some(own_branch)) => own_branch == branch,
            (UserRole::Viewer, None) => true,
            (UserRole::Admin, _) => true,
        }
    }

    pub fn can_manage_projects(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Hq)
    }

    pub fn can_write(&self) -> bool {
        self.role != UserRole::Viewer
    }

    pub fn ensure_visible(&self, hq: &str, branch: &str) -> Result<(), ApiError> {
        if self.allows(hq, branch) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "해당 현장에 대한 접근 권한이 없습니다.".to_string(),
            ))
        }
    }

    pub fn ensure_can_manage_projects(&self) -> Result<(), ApiError> {
        if self.can_manage_projects() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "현장 관리 권한이 없습니다.".to_string(),
            ))
        }
    }

    pub fn ensure_can_write(&self) -> Result<(), ApiError> {
        if self.can_write() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("조회 전용 계정입니다.".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let claims = state
            .jwt
            .verify(token)
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
        let user_id = claims
            .user_id()
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        let profile = run_blocking(&state.conn, move |conn| {
            profiles::table
                .find(user_id)
                .select(DbProfile::as_select())
                .first(conn)
                .optional()
                .map_err(ApiError::from)
        })
        .await?
        .ok_or_else(|| ApiError::Forbidden("등록된 사용자 정보가 없습니다.".to_string()))?;

        AuthUser::try_from(profile)
    }
}

pub async fn handle_get_me(State(_state): State<Arc<AppState>>, user: AuthUser) -> Json<AuthUser> {
    Json(user)
}
