use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dar::DataAccessRequest;
use super::dataset::Dataset;

/// A batch of DARs submitted together by one researcher, keyed by DAR
/// reference id. All member DARs share the creating user and a single
/// display lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DarCollection {
    pub dar_collection_id: i32,
    pub dar_code: String,
    pub create_user_id: i32,
    pub create_date: DateTime<Utc>,
    /// Member DARs by reference id, in stable key order.
    pub dars: BTreeMap<String, DataAccessRequest>,
    /// Datasets resolved for display, ascending by dataset id. Populated
    /// by the aggregator, not persisted.
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl DarCollection {
    /// Reference ids of all member DARs, in key order.
    pub fn reference_ids(&self) -> Vec<String> {
        self.dars.keys().cloned().collect()
    }

    /// Union of dataset ids referenced by member DARs, ascending.
    pub fn dataset_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .dars
            .values()
            .flat_map(|dar| dar.dataset_ids().iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dar::DataAccessRequest;

    impl DarCollection {
        pub fn example(dar_collection_id: i32, create_user_id: i32) -> Self {
            Self {
                dar_collection_id,
                dar_code: format!("DAR-{dar_collection_id:04}"),
                create_user_id,
                create_date: Utc::now(),
                dars: BTreeMap::new(),
                datasets: Vec::new(),
            }
        }

        pub fn with_dar(mut self, dar: DataAccessRequest) -> Self {
            self.dars.insert(dar.reference_id.clone(), dar);
            self
        }
    }

    #[test]
    fn dataset_ids_are_sorted_and_distinct() {
        let collection = DarCollection::example(1, 1)
            .with_dar(DataAccessRequest::example("ref-b", 1, vec![5, 2]))
            .with_dar(DataAccessRequest::example("ref-a", 1, vec![2, 9]));
        assert_eq!(collection.dataset_ids(), vec![2, 5, 9]);
        assert_eq!(collection.reference_ids(), vec!["ref-a", "ref-b"]);
    }
}
