use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use rocket_okapi::request::OpenApiFromRequest;
use serde::{Deserialize, Serialize};

use crate::models::staff::{StaffId, StaffRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // staff id
    pub role: StaffRole,
    pub exp: usize,
}

/// Signing material for staff bearer tokens, kept in Rocket managed state.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        AuthKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    // Tokens are normally issued by the identity service; this is for tooling and tests
    pub fn generate_token(&self, staff_id: StaffId, role: StaffRole) -> Result<String, jsonwebtoken::errors::Error> {
        // Set expiration time to 24 hours
        let expiration = (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize;

        let claims = Claims {
            sub: staff_id.to_string(),
            role,
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }
}

/// A request carrying a valid staff token (role ADMIN or STAFF).
#[derive(Debug, OpenApiFromRequest)]
pub struct AuthenticatedStaff {
    pub staff_id: StaffId,
    pub role: StaffRole,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedStaff {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = match request.headers().get_one("Authorization") {
            Some(header) if header.starts_with("Bearer ") => header[7..].trim(),
            _ => return Outcome::Error((Status::Unauthorized, ())),
        };

        let Some(keys) = request.rocket().state::<AuthKeys>() else {
            tracing::error!("AuthKeys not managed; rejecting staff request");
            return Outcome::Error((Status::InternalServerError, ()));
        };

        let claims = match keys.verify(token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "rejected staff token");
                return Outcome::Error((Status::Unauthorized, ()));
            }
        };

        match claims.sub.parse::<StaffId>() {
            Ok(staff_id) => Outcome::Success(AuthenticatedStaff { staff_id, role: claims.role }),
            Err(_) => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
