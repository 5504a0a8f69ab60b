//! Cluster directory: listing and field filtering
//!
//! The directory fetches every cluster eligible for maintenance and applies
//! the operator-supplied filters before the batch engine ever starts. It
//! runs once per invocation and never reruns mid-batch.
//!
//! Filters are a conjunction over named fields: within one field a
//! comma-separated value list is an OR, across fields the match is an AND.
//! Field names are validated against a fixed allow-list of accessors, so an
//! unrecognized key fails fast with the accepted keys spelled out.

use std::collections::BTreeMap;

use tracing::info;

use crate::cluster::ClusterDescriptor;
use crate::control::ControlPlaneClient;
use crate::error::{FleetError, Result};

/// Extracts the filterable string form of one field
type FieldAccessor = fn(&ClusterDescriptor) -> String;

/// Allow-list of filterable fields. Booleans match against "true"/"false".
const FILTER_FIELDS: &[(&str, FieldAccessor)] = &[
    ("organization_id", |c| c.organization_id.clone()),
    ("organization_name", |c| c.organization_name.clone()),
    ("organization_plan", |c| c.organization_plan.clone()),
    ("cluster_id", |c| c.id.clone()),
    ("cluster_name", |c| c.name.clone()),
    ("cluster_type", |c| c.cluster_type.as_str().to_string()),
    ("mode", |c| c.mode.as_str().to_string()),
    ("version", |c| c.version.clone()),
    ("production", |c| c.production.to_string()),
    ("current_status", |c| c.current_status.as_str().to_string()),
    ("karpenter", |c| c.karpenter.to_string()),
    ("pending_update", |c| c.pending_update.to_string()),
];

/// One validated predicate: field accessor plus accepted alternatives
#[derive(Debug)]
struct Predicate {
    field: &'static str,
    accessor: FieldAccessor,
    alternatives: Vec<String>,
}

impl Predicate {
    fn matches(&self, cluster: &ClusterDescriptor) -> bool {
        let value = (self.accessor)(cluster);
        self.alternatives.iter().any(|alt| *alt == value)
    }
}

/// Conjunction of field predicates, validated at construction
#[derive(Debug)]
pub struct ClusterFilter {
    predicates: Vec<Predicate>,
}

impl ClusterFilter {
    /// Build a filter from `field -> value[,value...]` pairs
    ///
    /// Fails with [`FleetError::UnknownFilterField`] for any key outside the
    /// recognized field set, before any remote call is made.
    pub fn from_pairs(pairs: &BTreeMap<String, String>) -> Result<Self> {
        let mut predicates = Vec::with_capacity(pairs.len());

        for (field, values) in pairs {
            let Some((name, accessor)) = FILTER_FIELDS
                .iter()
                .find(|(name, _)| *name == field.as_str())
                .copied()
            else {
                return Err(FleetError::UnknownFilterField {
                    field: field.clone(),
                    allowed: Self::recognized_fields().join(", "),
                });
            };

            predicates.push(Predicate {
                field: name,
                accessor,
                alternatives: values
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            });
        }

        Ok(Self { predicates })
    }

    /// Names of all fields a filter may reference
    pub fn recognized_fields() -> Vec<&'static str> {
        FILTER_FIELDS.iter().map(|(name, _)| *name).collect()
    }

    /// Whether the cluster satisfies every predicate
    pub fn matches(&self, cluster: &ClusterDescriptor) -> bool {
        self.predicates.iter().all(|p| p.matches(cluster))
    }

    /// Fields this filter constrains
    pub fn fields(&self) -> Vec<&'static str> {
        self.predicates.iter().map(|p| p.field).collect()
    }
}

/// Fetches and filters the clusters eligible for maintenance
pub struct ClusterDirectory<'a> {
    client: &'a ControlPlaneClient,
}

impl<'a> ClusterDirectory<'a> {
    /// Create a directory backed by the given control-plane client
    pub fn new(client: &'a ControlPlaneClient) -> Self {
        Self { client }
    }

    /// List all eligible clusters matching the given filter pairs
    ///
    /// Filter validation happens before the remote call, so a bad key never
    /// reaches the control plane.
    pub async fn list_eligible(
        &self,
        pairs: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterDescriptor>> {
        let filter = ClusterFilter::from_pairs(pairs)?;

        let clusters = self.client.list_clusters().await?;
        let total = clusters.len();

        let selected: Vec<ClusterDescriptor> =
            clusters.into_iter().filter(|c| filter.matches(c)).collect();

        info!(
            total = total,
            selected = selected.len(),
            fields = ?filter.fields(),
            "Cluster listing filtered"
        );

        Ok(selected)
    }
}

/// Parse `key=value` command-line pairs into a filter map
///
/// Repeating a key overwrites the earlier value; the comma syntax inside the
/// value is the way to OR alternatives.
pub fn parse_filter_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(FleetError::config(format!(
                "invalid filter '{pair}', expected key=value"
            )));
        };
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterMode, ClusterStatus, ClusterType};
    use chrono::{TimeZone, Utc};

    fn cluster(org: &str, name: &str, cluster_type: ClusterType) -> ClusterDescriptor {
        ClusterDescriptor {
            organization_id: format!("org-{org}"),
            organization_name: org.to_string(),
            organization_plan: "ENTERPRISE".to_string(),
            id: format!("cl-{name}"),
            name: name.to_string(),
            cluster_type,
            created_at: Utc.timestamp_opt(1700000000, 0).unwrap(),
            last_deployed_at: None,
            version: "1.29".to_string(),
            mode: ClusterMode::Managed,
            production: false,
            current_status: ClusterStatus::Deployed,
            karpenter: false,
            pending_update: false,
        }
    }

    fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = ClusterFilter::from_pairs(&pairs(&[("favorite_color", "blue")])).unwrap_err();
        match err {
            FleetError::UnknownFilterField { field, allowed } => {
                assert_eq!(field, "favorite_color");
                assert!(allowed.contains("organization_name"));
                assert!(allowed.contains("cluster_type"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_comma_values_are_or_within_a_field() {
        let filter =
            ClusterFilter::from_pairs(&pairs(&[("cluster_type", "EKS,GKE")])).unwrap();

        assert!(filter.matches(&cluster("acme", "a", ClusterType::Eks)));
        assert!(filter.matches(&cluster("acme", "b", ClusterType::Gke)));
        assert!(!filter.matches(&cluster("acme", "c", ClusterType::K3s)));
    }

    #[test]
    fn test_fields_are_and_across_keys() {
        let filter = ClusterFilter::from_pairs(&pairs(&[
            ("organization_name", "acme"),
            ("cluster_type", "EKS"),
        ]))
        .unwrap();

        assert!(filter.matches(&cluster("acme", "a", ClusterType::Eks)));
        assert!(!filter.matches(&cluster("acme", "b", ClusterType::Gke)));
        assert!(!filter.matches(&cluster("globex", "c", ClusterType::Eks)));
    }

    #[test]
    fn test_boolean_fields_match_text_form() {
        let mut prod = cluster("acme", "a", ClusterType::Eks);
        prod.production = true;

        let filter = ClusterFilter::from_pairs(&pairs(&[("production", "true")])).unwrap();
        assert!(filter.matches(&prod));
        assert!(!filter.matches(&cluster("acme", "b", ClusterType::Eks)));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ClusterFilter::from_pairs(&BTreeMap::new()).unwrap();
        assert!(filter.matches(&cluster("acme", "a", ClusterType::Eks)));
    }

    #[test]
    fn test_parse_filter_pairs() {
        let map = parse_filter_pairs(&[
            "organization_name=acme".to_string(),
            "cluster_type = EKS,GKE".to_string(),
        ])
        .unwrap();

        assert_eq!(map["organization_name"], "acme");
        assert_eq!(map["cluster_type"], "EKS,GKE");

        let err = parse_filter_pairs(&["nonsense".to_string()]).unwrap_err();
        assert!(err.to_string().contains("expected key=value"));
    }
}
