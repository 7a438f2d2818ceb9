use serde::{Deserialize, Serialize};

/// Data-use limitations attached to a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUse {
    pub general_use: Option<bool>,
    pub hmb_research: Option<bool>,
    #[serde(default)]
    pub disease_restrictions: Vec<String>,
}

impl DataUse {
    /// Short human-readable translation for notification text.
    pub fn translation(&self) -> String {
        let mut parts = Vec::new();
        if self.general_use == Some(true) {
            parts.push("GRU".to_string());
        }
        if self.hmb_research == Some(true) {
            parts.push("HMB".to_string());
        }
        for d in &self.disease_restrictions {
            parts.push(format!("DS-{d}"));
        }
        if parts.is_empty() {
            parts.push("No restrictions recorded".to_string());
        }
        parts.join(", ")
    }
}

/// A controlled dataset. Belongs to at most one DAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_id: i32,
    pub name: String,
    pub dac_id: Option<i32>,
    pub data_use: Option<DataUse>,
}

impl Dataset {
    /// Public identifier used in notification text.
    pub fn identifier(&self) -> String {
        format!("DUOS-{:06}", self.dataset_id)
    }
}
