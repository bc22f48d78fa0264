// Topology fixtures for integration tests

use glitch::topology::InMemoryTopology;
use glitch::types::UnitStatus;
use serde_json::{json, Value};

/// Snapshot document with a three-unit zookeeper and a two-unit kafka.
pub const SNAPSHOT_YAML: &str = r#"
models: [default]
controllers: [local]
relations: ["zookeeper:cluster"]
applications:
  zookeeper:
    units:
      zookeeper/0: { leader: true, agent_status: idle, workload_status: active }
      zookeeper/1: { agent_status: idle, workload_status: active }
      zookeeper/2: { agent_status: executing, workload_status: maintenance }
  kafka:
    units:
      kafka/0: { leader: true, agent_status: idle, workload_status: active }
      kafka/1: { agent_status: idle, workload_status: blocked }
"#;

/// A single zookeeper application with `units` units.
pub fn zookeeper(units: usize) -> InMemoryTopology {
    InMemoryTopology::new().with_application("zookeeper", units)
}

/// Zookeeper and kafka, with one kafka unit stuck executing.
pub fn mixed_topology() -> InMemoryTopology {
    let model = InMemoryTopology::new()
        .with_application("zookeeper", 3)
        .with_application("kafka", 2);
    model.add_unit(
        "kafka",
        "kafka/2",
        UnitStatus {
            leader: false,
            agent_status: "executing".into(),
            workload_status: Some("maintenance".into()),
        },
    );
    model
}

/// Plan entry rebooting one random unit of `application`.
pub fn reboot_one_of(application: &str) -> Value {
    json!({
        "action": "reboot",
        "selectors": [
            {"selector": "units", "application": application},
            {"selector": "one"}
        ]
    })
}

/// Plan document from a list of entries.
pub fn plan_of(entries: Vec<Value>) -> Value {
    json!({ "actions": entries })
}
