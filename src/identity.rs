//! Request guards that stand in for the external auth/transport layer
//! (§6 "Identity injection"), modeled on the teacher's `ClientIp`/`AdminKey`
//! `FromRequest` impls in `routes/mod.rs`.

use rocket::request::{FromRequest, Outcome, Request};

use crate::config::Config;
use crate::ids;
use crate::models::Identity as IdentityModel;

/// The verified identity the (external) auth layer is assumed to deliver.
/// In the absence of the expected headers (e.g. local dev, integration
/// tests) an anonymous identity is synthesized, matching the teacher's
/// trust-based, zero-signup posture — this core does not parse tokens.
pub struct Identity(pub IdentityModel);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = req.headers();
        let user_id = headers
            .get_one("X-User-Id")
            .map(|s| s.to_string())
            .unwrap_or_else(|| "u:anonymous".to_string());
        let email = headers
            .get_one("X-User-Email")
            .map(|s| s.to_string())
            .unwrap_or_else(|| "anonymous@local".to_string());
        let email_domain = email
            .split('@')
            .nth(1)
            .unwrap_or("local")
            .to_lowercase();
        let groups = headers
            .get_one("X-User-Groups")
            .map(|s| {
                s.split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let is_service = headers.get_one("X-Is-Service") == Some("1");

        Outcome::Success(Identity(IdentityModel {
            user_id,
            email,
            email_domain,
            groups,
            is_service,
        }))
    }
}

/// `tenant_id = "t:" ∥ email_domain` except configured platform domains,
/// which resolve to the single platform tenant `t:ubl_core` (§6).
pub fn tenant_id_for(email_domain: &str, config: &Config) -> String {
    if config.is_platform_domain(email_domain) {
        "t:ubl_core".to_string()
    } else {
        format!("t:{email_domain}")
    }
}

/// `X-Request-Id` if present, else a freshly generated `req:<uuid>` (§7).
pub struct RequestId(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let id = req
            .headers()
            .get_one("X-Request-Id")
            .map(|s| s.to_string())
            .unwrap_or_else(ids::request_id);
        Outcome::Success(RequestId(id))
    }
}
