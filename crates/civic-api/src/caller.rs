//! The request's principal, read from trusted identity headers.
//!
//! Authentication happens in front of this service. The gateway forwards the
//! result as:
//!
//! | Header            | Value                                          |
//! |-------------------|------------------------------------------------|
//! | `x-user-id`       | UUID; absent for anonymous requests            |
//! | `x-roles`         | comma-separated roles, e.g. `CITIZEN,TEAM_MEMBER` |
//! | `x-department-id` | UUID of the caller's department, optional      |

use axum::{extract::FromRequestParts, http::request::Parts};
use civic_core::{
  ability::Ability,
  principal::{Principal, Role},
};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLES_HEADER: &str = "x-roles";
pub const DEPARTMENT_HEADER: &str = "x-department-id";

/// The (possibly anonymous) caller of a request.
#[derive(Debug, Clone)]
pub struct Caller {
  principal: Option<Principal>,
}

impl Caller {
  pub fn anonymous() -> Self { Self { principal: None } }

  pub fn principal(&self) -> Option<&Principal> { self.principal.as_ref() }

  pub fn is_anonymous(&self) -> bool { self.principal.is_none() }

  /// A fresh ability for this request. Never cached across requests.
  pub fn ability(&self) -> Ability { Ability::for_principal(self.principal.as_ref()) }

  /// The principal, for operations that record an actor.
  pub fn require(&self) -> Result<Principal, ApiError> {
    self
      .principal
      .clone()
      .ok_or_else(|| civic_core::Error::forbidden("authentication required").into())
  }

  fn from_parts(parts: &Parts) -> Result<Self, ApiError> {
    let Some(user_id) = header(parts, USER_ID_HEADER)? else {
      return Ok(Self::anonymous());
    };
    let user_id = parse_uuid(USER_ID_HEADER, user_id)?;

    let roles = match header(parts, ROLES_HEADER)? {
      Some(raw) => parse_roles(raw)?,
      None => Vec::new(),
    };

    let mut principal = Principal::new(user_id, roles);
    if let Some(department) = header(parts, DEPARTMENT_HEADER)? {
      principal = principal.with_department(parse_uuid(DEPARTMENT_HEADER, department)?);
    }
    Ok(Self { principal: Some(principal) })
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Self::from_parts(parts)
  }
}

/// A present, non-blank header value. Values that are not visible ASCII are
/// rejected rather than ignored.
fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
  let Some(value) = parts.headers.get(name) else {
    return Ok(None);
  };
  let value = value
    .to_str()
    .map_err(|_| ApiError::BadRequest(format!("{name} is not valid text")))?
    .trim();
  Ok((!value.is_empty()).then_some(value))
}

fn parse_uuid(name: &str, value: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(value).map_err(|e| ApiError::BadRequest(format!("invalid {name}: {e}")))
}

fn parse_roles(raw: &str) -> Result<Vec<Role>, ApiError> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse::<Role>()
        .map_err(|_| ApiError::BadRequest(format!("unknown role {s:?}")))
    })
    .collect()
}
