pub mod bot;
pub mod chart;
pub mod config;
pub mod conversation;
pub mod ranking;
pub mod swis;
pub mod telegram;
pub mod util;

use serde::{Deserialize, Serialize};

/// One monitored node as returned by the Orion node query.
///
/// Every column may be missing or `null` in the backend response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "NodeID", default)]
    pub node_id: Option<i64>,
    #[serde(rename = "Caption", default)]
    pub caption: Option<String>,
    #[serde(rename = "CPULoad", default)]
    pub cpu_load: Option<f64>,
    #[serde(rename = "PercentMemoryUsed", default)]
    pub percent_memory_used: Option<f64>,
}

impl NodeRecord {
    /// Value of the given metric, zero when the backend did not report it.
    pub fn value(&self, metric: Metric) -> f64 {
        let value = match metric {
            Metric::Cpu => self.cpu_load,
            Metric::Memory => self.percent_memory_used,
        };
        value.unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.caption.as_deref().unwrap_or("N/A")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cpu,
    Memory,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Cpu, Metric::Memory];

    /// Column name in the node query.
    pub fn field(self) -> &'static str {
        match self {
            Metric::Cpu => "CPULoad",
            Metric::Memory => "PercentMemoryUsed",
        }
    }

    /// Label shown on the menu keyboard and in chart titles.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "Memoria",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Metric::Cpu => "top_nodes_cpu_usage.png",
            Metric::Memory => "top_nodes_memory_usage.png",
        }
    }

    /// Parse a menu answer, ignoring surrounding whitespace and case.
    pub fn from_choice(input: &str) -> Option<Metric> {
        let choice = input.trim().to_lowercase();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.label().to_lowercase() == choice)
    }
}
