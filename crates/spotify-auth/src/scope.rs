//! Permission scopes the client may request
//!
//! The set is closed: only the playlist and user-profile scopes this client
//! actually needs can be expressed, so a typo in configuration fails at
//! startup instead of at the consent screen.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    PlaylistReadPrivate,
    PlaylistReadCollaborative,
    PlaylistModifyPublic,
    PlaylistModifyPrivate,
    UserReadPrivate,
    UserReadEmail,
}

impl Scope {
    /// Every scope in the allow-list, in the order the gateway requests them by default.
    pub const ALL: [Scope; 6] = [
        Scope::PlaylistReadPrivate,
        Scope::PlaylistReadCollaborative,
        Scope::PlaylistModifyPublic,
        Scope::PlaylistModifyPrivate,
        Scope::UserReadPrivate,
        Scope::UserReadEmail,
    ];

    /// Wire name used in the `scope` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::PlaylistReadPrivate => "playlist-read-private",
            Scope::PlaylistReadCollaborative => "playlist-read-collaborative",
            Scope::PlaylistModifyPublic => "playlist-modify-public",
            Scope::PlaylistModifyPrivate => "playlist-modify-private",
            Scope::UserReadPrivate => "user-read-private",
            Scope::UserReadEmail => "user-read-email",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| common::Error::Config(format!("unsupported scope: {s}")))
    }
}

/// Space-join scopes in caller order, as the `scope` parameter expects.
pub fn join(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(Scope::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
