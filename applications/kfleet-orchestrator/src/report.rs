//! Operator-facing table rendering

use tabled::{Table, Tabled};

use crate::batch::BatchReport;
use crate::cluster::ClusterDescriptor;

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Organization")]
    organization: String,
    #[tabled(rename = "Cluster")]
    name: String,
    #[tabled(rename = "Type")]
    cluster_type: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Prod")]
    production: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&ClusterDescriptor> for ClusterRow {
    fn from(cluster: &ClusterDescriptor) -> Self {
        Self {
            organization: cluster.organization_name.clone(),
            name: cluster.name.clone(),
            cluster_type: cluster.cluster_type.to_string(),
            mode: cluster.mode.to_string(),
            version: cluster.version.clone(),
            production: if cluster.production { "yes" } else { "no" }.to_string(),
            status: cluster.current_status.to_string(),
        }
    }
}

/// Render a cluster listing as a table
pub fn cluster_table(clusters: &[ClusterDescriptor]) -> String {
    Table::new(clusters.iter().map(ClusterRow::from)).to_string()
}

/// Render the final processed/pending partition of a batch run
pub fn render_report(report: &BatchReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("Processed ({}):\n", report.processed.len()));
    if report.processed.is_empty() {
        out.push_str("  none\n");
    } else {
        out.push_str(&cluster_table(&report.processed));
        out.push('\n');
    }

    out.push_str(&format!("\nPending, left untouched ({}):\n", report.pending.len()));
    if report.pending.is_empty() {
        out.push_str("  none\n");
    } else {
        out.push_str(&cluster_table(&report.pending));
        out.push('\n');
    }

    out
}
