//! Static bearer tokens mapped to actors

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::authn::actor::Actor;

/// A configured token as it appears in the settings file
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiTokenConfig {
    pub token: String,
    pub actor_id: String,
    #[serde(default)]
    pub privileged: bool,
}

impl fmt::Debug for ApiTokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTokenConfig")
            .field("token", &"[REDACTED]")
            .field("actor_id", &self.actor_id)
            .field("privileged", &self.privileged)
            .finish()
    }
}

struct ApiToken {
    secret: SecretString,
    actor: Actor,
}

/// Resolves a presented bearer token to its actor
pub struct ApiTokens {
    tokens: Vec<ApiToken>,
}

impl ApiTokens {
    pub fn new(configs: &[ApiTokenConfig]) -> Self {
        let tokens = configs
            .iter()
            .filter(|c| !c.token.is_empty())
            .map(|c| ApiToken {
                secret: SecretString::from(c.token.clone()),
                actor: Actor::new(c.actor_id.clone(), c.privileged),
            })
            .collect();
        Self { tokens }
    }

    pub fn authenticate(&self, presented: &str) -> Option<Actor> {
        self.tokens
            .iter()
            .find(|t| constant_time_eq(t.secret.expose_secret().as_bytes(), presented.as_bytes()))
            .map(|t| t.actor.clone())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Debug for ApiTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTokens")
            .field("count", &self.tokens.len())
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
