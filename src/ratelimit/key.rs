//! Limiter key construction.

use std::fmt;

use super::rules::Route;

/// A key that identifies one caller of one route.
///
/// Public routes key on the caller's network address and the targeted user;
/// identity routes key on the submitted email or username. The route name is
/// always the last segment, so the same caller never shares quota across routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimitKey {
    /// Segments preceding the route name
    pub parts: Vec<String>,
    /// The route this key is counted against
    pub route: Route,
}

impl LimitKey {
    /// `{caller_address}_{target_username}_{route}`
    pub fn public(caller_address: &str, target_username: &str, route: Route) -> Self {
        Self {
            parts: vec![caller_address.to_string(), target_username.to_string()],
            route,
        }
    }

    /// `{identity}_{route}`
    pub fn identity(identity: &str, route: Route) -> Self {
        Self {
            parts: vec![identity.to_string()],
            route,
        }
    }

    /// The string handed to the counter store.
    pub fn to_string_key(&self) -> String {
        let mut key = self.parts.join("_");
        key.push('_');
        key.push_str(self.route.name());
        key
    }
}

impl fmt::Display for LimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_key())
    }
}
