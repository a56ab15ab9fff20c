// Player identity handed to the engine by whoever did the sign-in.
// Treated as opaque: never refreshed or validated here.

use serde::{Deserialize, Serialize};

const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub player_id: String,
    pub player_name: String,
    pub access_token: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl Credentials {
    pub fn new(
        player_id: impl Into<String>,
        player_name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            player_name: player_name.into(),
            access_token: access_token.into(),
        }
    }

    pub fn offline(player_name: &str) -> Self {
        Self::new(OFFLINE_UUID, player_name.trim(), "offline_access_token")
    }

    /// Player id as the game expects it: no hyphens.
    pub fn uuid_without_hyphens(&self) -> String {
        self.player_id.replace('-', "")
    }

    pub fn sanitized(mut self) -> Self {
        if self.player_name.trim().is_empty() {
            self.player_name = "Player".into();
        }
        if self.player_id.trim().is_empty() {
            self.player_id = OFFLINE_UUID.into();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = "offline_access_token".into();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_stripped_of_hyphens() {
        let creds = Credentials::new("069a79f4-44e9-4726-a5be-fca90e38aaf5", "Notch", "token");
        assert_eq!(creds.uuid_without_hyphens(), "069a79f444e94726a5befca90e38aaf5");
    }

    #[test]
    fn blank_fields_get_offline_defaults() {
        let creds = Credentials::new(" ", "", "").sanitized();
        assert_eq!(creds.player_name, "Player");
        assert_eq!(creds.player_id, OFFLINE_UUID);
        assert_eq!(creds.access_token, "offline_access_token");
    }
}
