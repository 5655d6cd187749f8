use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id_intern: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub id_project: Option<i64>,
    #[serde(default)]
    pub id_tutor: Option<i64>,
    #[serde(default)]
    pub team_chat: Option<String>,
    #[serde(default)]
    pub teg: Option<String>,
    #[serde(default)]
    pub interns: Vec<TeamMember>,
}

impl Team {
    pub fn has_member(&self, user_id: i64) -> bool {
        self.interns.iter().any(|m| m.id_intern == user_id)
    }

    /// Body for `PUT team/{id}` that keeps everything but the given changes
    pub fn to_payload(&self) -> TeamPayload {
        TeamPayload {
            id_project: self.id_project,
            id_tutor: self.id_tutor,
            interns: self.interns.clone(),
            title: self.title.clone(),
            team_chat: self.team_chat.clone(),
            teg: self.teg.clone().or_else(|| Some(self.title.clone())),
        }
    }
}

/// Body of `POST team/` and `PUT team/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct TeamPayload {
    pub id_project: Option<i64>,
    pub id_tutor: Option<i64>,
    pub interns: Vec<TeamMember>,
    pub title: String,
    pub team_chat: Option<String>,
    pub teg: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_membership_and_payload() {
        let json = r#"{"id": 8, "title": "Frontend", "id_project": 2, "id_tutor": 11,
                       "team_chat": "https://t.me/frontend",
                       "interns": [{"id_intern": 4, "role": "developer"}, {"id_intern": 5}]}"#;
        let team: Team = serde_json::from_str(json).unwrap();

        assert!(team.has_member(4));
        assert!(!team.has_member(11));

        let payload = team.to_payload();
        assert_eq!(payload.title, "Frontend");
        assert_eq!(payload.teg.as_deref(), Some("Frontend"));
        assert_eq!(payload.interns.len(), 2);
    }
}
