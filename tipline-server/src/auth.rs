//! Actor extraction from trusted identity headers
//!
//! The identity provider in front of this service authenticates callers and
//! injects `x-actor-id` / `x-actor-role`. Role is resolved to capabilities
//! here, once, so handlers never compare role strings.

use axum::{extract::FromRequestParts, http::request::Parts};
use tipline_common::{models::Role, Error};
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Authenticated caller. Extraction fails with `Permission` when the
/// identity headers are absent; use [`MaybeActor`] for anonymous reads.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

/// Optional caller for endpoints that serve anonymous reads.
#[derive(Debug, Clone, Copy)]
pub struct MaybeActor(pub Option<Actor>);

impl MaybeActor {
    pub fn id(&self) -> Option<Uuid> {
        self.0.map(|a| a.id)
    }

    pub fn is_admin(&self) -> bool {
        self.0.map(|a| a.role.can_review()).unwrap_or(false)
    }
}

fn actor_from_parts(parts: &Parts) -> Result<Option<Actor>, Error> {
    let Some(raw_id) = parts.headers.get(ACTOR_ID_HEADER) else {
        return Ok(None);
    };

    let raw_id = raw_id
        .to_str()
        .map_err(|_| Error::Validation(format!("{} is not valid UTF-8", ACTOR_ID_HEADER)))?;
    let id = Uuid::parse_str(raw_id)
        .map_err(|_| Error::Validation(format!("{} is not a UUID", ACTOR_ID_HEADER)))?;

    let role = match parts.headers.get(ACTOR_ROLE_HEADER) {
        None => Role::Informant,
        Some(raw_role) => {
            let raw_role = raw_role.to_str().map_err(|_| {
                Error::Validation(format!("{} is not valid UTF-8", ACTOR_ROLE_HEADER))
            })?;
            Role::parse(raw_role)
                .ok_or_else(|| Error::Validation(format!("unknown role '{}'", raw_role)))?
        }
    };

    Ok(Some(Actor { id, role }))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match actor_from_parts(parts)? {
            Some(actor) => Ok(actor),
            None => Err(Error::Permission("authentication required".to_string()).into()),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeActor(actor_from_parts(parts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn missing_headers_mean_anonymous() {
        let parts = parts_with(&[]);
        assert!(actor_from_parts(&parts).unwrap().is_none());
    }

    #[test]
    fn id_without_role_defaults_to_informant() {
        let id = Uuid::new_v4();
        let parts = parts_with(&[(ACTOR_ID_HEADER, &id.to_string())]);
        let actor = actor_from_parts(&parts).unwrap().unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::Informant);
    }

    #[test]
    fn role_header_is_parsed() {
        let id = Uuid::new_v4();
        let parts = parts_with(&[
            (ACTOR_ID_HEADER, &id.to_string()),
            (ACTOR_ROLE_HEADER, "ADMIN"),
        ]);
        let actor = actor_from_parts(&parts).unwrap().unwrap();
        assert!(actor.role.can_review());
    }

    #[test]
    fn malformed_id_is_validation_error() {
        let parts = parts_with(&[(ACTOR_ID_HEADER, "not-a-uuid")]);
        assert!(matches!(
            actor_from_parts(&parts),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn unknown_role_is_validation_error() {
        let id = Uuid::new_v4();
        let parts = parts_with(&[
            (ACTOR_ID_HEADER, &id.to_string()),
            (ACTOR_ROLE_HEADER, "WIZARD"),
        ]);
        assert!(matches!(
            actor_from_parts(&parts),
            Err(Error::Validation(_))
        ));
    }
}
